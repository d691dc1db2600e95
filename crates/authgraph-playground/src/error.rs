use authgraph_core::{GraphBuildError, ParseError, ValidationError};

use crate::backend::BackendError;

/// Everything the playground boundary can fail with. At the host boundary
/// these collapse into a human-readable message; the browser UI only
/// displays or logs them.
#[derive(Debug, thiserror::Error)]
pub enum PlaygroundError {
    #[error("schema parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("schema validation errors: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("graph build error: {0}")]
    Build(#[from] GraphBuildError),

    #[error("no schema loaded")]
    SchemaNotFound,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
