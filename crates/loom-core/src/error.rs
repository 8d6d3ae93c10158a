use crate::entity::EntityKey;
use crate::integrity::IntegrityError;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the catalog, the resolver and persistence.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested entity does not exist in the catalog.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityKey),

    /// The catalog failed its referential-integrity pass.
    #[error("world failed to load: {} integrity error(s)", .0.len())]
    Integrity(Vec<IntegrityError>),

    /// A save was written against an incompatible catalog version.
    #[error("save targets catalog version {saved} but the world is version {current}: {detail}")]
    PersistenceVersionMismatch {
        /// Catalog version recorded in the save.
        saved: String,
        /// Version of the loaded catalog.
        current: String,
        /// What could not be carried over.
        detail: String,
    },

    /// The save file uses an unknown format revision.
    #[error("unsupported save format {0}")]
    SaveFormat(u32),

    /// The save refers to entities its own catalog version does not have.
    #[error("corrupt save: {0}")]
    CorruptSave(String),

    /// The save could not be (de)serialized.
    #[error("invalid save data: {0}")]
    Json(#[from] serde_json::Error),
}
