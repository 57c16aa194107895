use thiserror::Error;

use crate::schema::SchemaKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Top-level schema must be a record, got {0}")]
    NotARecord(SchemaKind),

    #[error("Sample contains no records")]
    EmptySample,

    #[error("Corrupt summary data: {0}")]
    FormatCorruption(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
