//! HTTP-shaped front end for the store.
//!
//! Translates method/path/header requests onto the CRUD surface and checks
//! `user`/`token` headers against an [`Authenticator`](crate::auth::Authenticator)
//! before any route other than `/login`. Transport agnostic: a server only
//! needs to build a [`GatewayRequest`] and write back the [`GatewayResponse`].

mod request;
mod router;

pub use request::{GatewayRequest, GatewayResponse, Method};
pub use router::{status_for, Gateway, Route};
