//! cdc-console - run a store behind the gateway and print its change feed.
//!
//! Requests are read from stdin, one per line:
//!
//! ```text
//! POST /login user=James -- Holden
//! PUT /create user=James token=<token> -- hello
//! GET /read/<id> user=James token=<token>
//! ```
//!
//! Every change event is printed to stdout as one JSON line.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cdc_store::{
    ChangeEvent, Gateway, GatewayRequest, ListenResponse, Method, ServiceConfig, SinkClosed,
    Store, TokenAuthority, TokenSweeper,
};

#[derive(Debug, Parser)]
#[command(name = "cdc-console", version, about = "Record store with a live change feed")]
struct Args {
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pending change events before mutations block.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Token lifetime in seconds (0 disables expiry).
    #[arg(long)]
    token_ttl_secs: Option<u64>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> cdc_store::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };
        if let Some(capacity) = self.queue_capacity {
            config.store.queue_capacity = capacity;
        }
        if let Some(ttl) = self.token_ttl_secs {
            config.auth.token_ttl_secs = ttl;
        }
        Ok(config)
    }
}

/// Parse `METHOD PATH [name=value ...] [-- body]`.
fn parse_request(line: &str) -> Result<GatewayRequest, String> {
    let (head, body) = match line.split_once(" -- ") {
        Some((head, body)) => (head, Some(body)),
        None => (line, None),
    };

    let mut parts = head.split_whitespace();
    let method: Method = parts.next().ok_or("missing method")?.parse()?;
    let path = parts.next().ok_or("missing path")?;

    let mut request = GatewayRequest::new(method, path);
    for header in parts {
        let (name, value) = header
            .split_once('=')
            .ok_or_else(|| format!("malformed header: {}", header))?;
        request = request.header(name, value);
    }
    if let Some(body) = body {
        request = request.body(body.as_bytes());
    }
    Ok(request)
}

fn print_event(event: &ChangeEvent) -> Result<(), SinkClosed> {
    let line = ListenResponse::from(event).to_json().map_err(|_| SinkClosed)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line).map_err(|_| SinkClosed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = args.into_config()?;
    tracing::info!(
        queue_capacity = config.store.queue_capacity,
        token_ttl_secs = config.auth.token_ttl_secs,
        "configuration loaded"
    );

    let store = Arc::new(Store::new(config.store)?);
    let authority = Arc::new(TokenAuthority::new(config.auth));
    let _sweeper = TokenSweeper::for_authority(Arc::clone(&authority))?;
    let gateway = Gateway::new(authority, store.clone());

    let printer = {
        let store = Arc::clone(&store);
        thread::Builder::new()
            .name("cdc-printer".into())
            .spawn(move || store.listen(Box::new(print_event)))?
    };

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_request(line) {
            Ok(request) => {
                let response = gateway.handle(&request);
                println!("{} {}", response.status, response.text());
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }

    store.shutdown();
    match printer.join() {
        Ok(Ok(reason)) => tracing::info!(?reason, "change feed closed"),
        Ok(Err(e)) => tracing::error!(error = %e, "change feed failed"),
        Err(_) => tracing::error!("printer thread panicked"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = parse_request("PUT /create user=James token=abc -- hello world").unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "/create");
        assert_eq!(request.get_header("user"), Some("James"));
        assert_eq!(request.get_header("token"), Some("abc"));
        assert_eq!(request.body, b"hello world".to_vec());
    }

    #[test]
    fn test_parse_request_errors() {
        assert!(parse_request("").is_err());
        assert!(parse_request("GET").is_err());
        assert!(parse_request("FETCH /read/x").is_err());
        assert!(parse_request("GET /read/x user").is_err());
    }
}
