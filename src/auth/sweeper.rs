//! Periodic purge of expired tokens.

use crossbeam_channel::{bounded, select, tick, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::tokens::TokenAuthority;

/// Background thread calling [`TokenAuthority::purge_expired`] on a fixed
/// interval. Stops on [`shutdown`](Self::shutdown) or drop.
pub struct TokenSweeper {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl TokenSweeper {
    /// Start sweeping every `interval`.
    pub fn spawn(authority: Arc<TokenAuthority>, interval: Duration) -> std::io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let ticker = tick(interval);

        let handle = thread::Builder::new()
            .name("token-sweeper".into())
            .spawn(move || {
                tracing::debug!(?interval, "token sweeper started");
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            authority.purge_expired();
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                tracing::debug!("token sweeper stopped");
            })?;

        Ok(Self {
            shutdown: shutdown_tx,
            handle: Some(handle),
        })
    }

    /// Start a sweeper matching the authority's TTL, if it has one.
    pub fn for_authority(authority: Arc<TokenAuthority>) -> std::io::Result<Option<Self>> {
        match authority.ttl() {
            Some(ttl) => Self::spawn(authority, ttl).map(Some),
            None => Ok(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stop the sweeper and wait for its thread.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.shutdown.try_send(());
            if handle.join().is_err() {
                tracing::error!("token sweeper panicked");
            }
        }
    }
}

impl Drop for TokenSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
