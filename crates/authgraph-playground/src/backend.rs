//! Boundary to the collaborator services the playground embeds: permission
//! evaluation, relationship storage, and schema persistence. The playground
//! only shapes requests and interprets results; implementations live outside
//! this crate.

use crate::requests::{
    CheckRequest, ReadSchemaRequest, WriteRelationshipRequest, WriteSchemaRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

pub trait PlaygroundBackend {
    fn write_schema(&self, request: &WriteSchemaRequest) -> Result<(), BackendError>;

    /// Returns the currently loaded schema text, if any.
    fn read_schema(&self, request: &ReadSchemaRequest) -> Result<Option<String>, BackendError>;

    fn write_relationship(&self, request: &WriteRelationshipRequest) -> Result<(), BackendError>;

    fn check(&self, request: &CheckRequest) -> Result<bool, BackendError>;
}
