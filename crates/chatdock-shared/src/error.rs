use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}
