//! Request routing and error mapping.

use crate::auth::Authenticator;
use crate::error::StoreError;
use crate::service::CrudService;
use crate::wire::{CreateRequest, Data, DeleteRequest, ReadRequest, UpdateRequest};
use std::sync::Arc;

use super::request::{GatewayRequest, GatewayResponse, Method};

/// A matched route with its path parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Create,
    Read(String),
    Update(String),
    Delete(String),
}

impl Route {
    /// Match a path, ignoring the method.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or("");
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match segments.as_slice() {
            ["login"] => Some(Route::Login),
            ["create"] => Some(Route::Create),
            ["read", id] if !id.is_empty() => Some(Route::Read(id.to_string())),
            ["update", id] if !id.is_empty() => Some(Route::Update(id.to_string())),
            ["delete", id] if !id.is_empty() => Some(Route::Delete(id.to_string())),
            _ => None,
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Route::Login => Method::Post,
            Route::Create => Method::Put,
            Route::Read(_) => Method::Get,
            Route::Update(_) => Method::Post,
            Route::Delete(_) => Method::Delete,
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

/// Maps gateway requests onto the CRUD surface.
pub struct Gateway {
    auth: Arc<dyn Authenticator>,
    crud: Arc<dyn CrudService>,
}

impl Gateway {
    pub fn new(auth: Arc<dyn Authenticator>, crud: Arc<dyn CrudService>) -> Self {
        Self { auth, crud }
    }

    pub fn handle(&self, request: &GatewayRequest) -> GatewayResponse {
        tracing::trace!(method = %request.method, path = %request.path, "request");

        let route = match Route::parse(&request.path) {
            Some(route) => route,
            None => return GatewayResponse::error(404, "no such route"),
        };
        if route.method() != request.method {
            return GatewayResponse::error(405, "method not allowed");
        }

        if route.requires_auth() {
            let user = request.get_header("user").unwrap_or_default();
            let token = request.get_header("token").unwrap_or_default();
            if let Err(e) = self.auth.validate(user, token) {
                return GatewayResponse::error(401, e);
            }
        }

        let response = self.dispatch(route, request);
        if !response.is_success() {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                status = response.status,
                "request failed"
            );
        }
        response
    }

    fn dispatch(&self, route: Route, request: &GatewayRequest) -> GatewayResponse {
        let result = match route {
            Route::Login => {
                let user = request.get_header("user").unwrap_or_default();
                let password = String::from_utf8_lossy(&request.body);
                self.auth.login(user, &password).map(GatewayResponse::ok)
            }
            Route::Create => self
                .crud
                .create(CreateRequest {
                    raw: request.body.clone(),
                })
                .map(|created| GatewayResponse::ok(created.id)),
            Route::Read(id) => self
                .crud
                .read(ReadRequest { id })
                .map(|read| GatewayResponse::ok(read.raw)),
            Route::Update(id) => self
                .crud
                .update(UpdateRequest {
                    data: Data {
                        id,
                        raw: request.body.clone(),
                    },
                })
                .map(|_| GatewayResponse::empty()),
            Route::Delete(id) => self
                .crud
                .delete(DeleteRequest { id })
                .map(|_| GatewayResponse::empty()),
        };

        result.unwrap_or_else(|e| GatewayResponse::error(status_for(&e), e))
    }
}

/// HTTP status for a store error.
pub fn status_for(error: &StoreError) -> u16 {
    match error {
        StoreError::RecordNotFound(_) => 404,
        StoreError::Unauthenticated(_) => 401,
        StoreError::ShutDown => 503,
        _ => 500,
    }
}
