//! RPC surface over the store.
//!
//! [`CrudService`] and [`CdcService`] take and return the wire shapes, so
//! front ends such as the gateway depend on the surface, not on [`Store`].

use crate::error::Result;
use crate::store::Store;
use crate::subscriptions::{DropReason, EventSink};
use crate::wire::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};

/// Create/Read/Update/Delete on opaque payloads.
pub trait CrudService: Send + Sync {
    fn create(&self, request: CreateRequest) -> Result<CreateResponse>;

    /// Fails with `RecordNotFound` if the id is absent.
    fn read(&self, request: ReadRequest) -> Result<ReadResponse>;

    /// Fails with `RecordNotFound` if the id is absent.
    fn update(&self, request: UpdateRequest) -> Result<UpdateResponse>;

    /// Always succeeds for a running store.
    fn delete(&self, request: DeleteRequest) -> Result<DeleteResponse>;
}

/// Server-push change feed.
pub trait CdcService: Send + Sync {
    /// Blocks for the lifetime of the subscription.
    fn listen(&self, sink: Box<dyn EventSink>) -> Result<DropReason>;
}

impl CrudService for Store {
    fn create(&self, request: CreateRequest) -> Result<CreateResponse> {
        let id = Store::create(self, request.raw)?;
        Ok(CreateResponse { id: id.to_string() })
    }

    fn read(&self, request: ReadRequest) -> Result<ReadResponse> {
        let raw = self.read_str(&request.id)?;
        Ok(ReadResponse { raw })
    }

    fn update(&self, request: UpdateRequest) -> Result<UpdateResponse> {
        self.update_str(&request.data.id, request.data.raw)?;
        Ok(UpdateResponse {})
    }

    fn delete(&self, request: DeleteRequest) -> Result<DeleteResponse> {
        self.delete_str(&request.id)?;
        Ok(DeleteResponse {})
    }
}

impl CdcService for Store {
    fn listen(&self, sink: Box<dyn EventSink>) -> Result<DropReason> {
        Store::listen(self, sink)
    }
}
