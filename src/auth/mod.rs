//! Token authentication for the gateway.
//!
//! Users log in with a password and receive a token that stays valid for a
//! configured time-to-live. Expired tokens are rejected on validation and
//! purged by a [`TokenSweeper`] running in the background.

mod sweeper;
mod tokens;

pub use sweeper::TokenSweeper;
pub use tokens::{AuthConfig, Authenticator, TokenAuthority};
