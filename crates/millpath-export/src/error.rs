//! Errors returned by the export serializers.

use millpath_pipeline::PipelineError;

/// Errors that can occur while producing output.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Output configuration is invalid.
    #[error("invalid export configuration: {0}")]
    InvalidConfig(String),

    /// Planning the tour failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
