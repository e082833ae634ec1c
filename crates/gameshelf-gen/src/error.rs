use gameshelf_core::{CatalogError, GenerateError, OutputError, OwnerMapError};

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    OwnerMap(#[from] OwnerMapError),
    #[error("failed to set up catalog client: {0}")]
    Client(#[from] CatalogError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl AppError {
    /// Process exit code: 2 for setup problems the operator must fix, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::OwnerMap(OwnerMapError::Io { .. } | OwnerMapError::Empty) => 2,
            _ => 1,
        }
    }
}
