use worldsim_common::UniverseId;
use worldsim_kernel::ResourceError;

/// Errors from binary records and file-backed persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Includes `UnexpectedEof` for truncated records.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("planet extent exponent {exponent} on the {axis} axis is outside 0..=30")]
    InvalidExtent { axis: char, exponent: i32 },
    #[error("unknown definition: {0:?}")]
    UnknownDefinition(String),
    #[error("unknown definition index: {0}")]
    UnknownDefinitionIndex(u16),
    #[error("definition table is full")]
    DefinitionTableFull,
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("universe {0} not found")]
    UniverseNotFound(UniverseId),
    #[error("no universe loaded")]
    NoUniverseLoaded,
}

impl From<PersistError> for ResourceError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::UniverseNotFound(id) => ResourceError::UniverseNotFound(id),
            PersistError::NoUniverseLoaded => ResourceError::NoUniverseLoaded,
            other => ResourceError::Backend(Box::new(other)),
        }
    }
}
