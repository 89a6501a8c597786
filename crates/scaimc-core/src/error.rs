use thiserror::Error;

use crate::entity::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Entity not found: {kind} {id}")]
    EntityNotFound { kind: EntityKind, id: uuid::Uuid },

    #[error("Invalid entity kind: {0}")]
    InvalidEntityKind(String),

    #[error("Invalid character offsets: {0}")]
    InvalidOffsets(String),

    #[error("Duplicate term: {term} already exists as {kind}")]
    DuplicateTerm { kind: EntityKind, term: String },

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
