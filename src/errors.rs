use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrayMatchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("query parse error: {0}")]
    QueryParse(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl GrayMatchError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GrayMatchError::InvalidInput(msg.into())
    }

    pub fn query_parse<T: Into<String>>(msg: T) -> Self {
        GrayMatchError::QueryParse(msg.into())
    }

    pub fn cache<T: Into<String>>(msg: T) -> Self {
        GrayMatchError::Cache(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        GrayMatchError::Storage(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        GrayMatchError::Io(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GrayMatchError::Serialization(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GrayMatchError::NotFound(msg.into())
    }
}

impl From<std::io::Error> for GrayMatchError {
    fn from(err: std::io::Error) -> Self {
        GrayMatchError::io(err.to_string())
    }
}

impl From<rusqlite::Error> for GrayMatchError {
    fn from(err: rusqlite::Error) -> Self {
        GrayMatchError::storage(err.to_string())
    }
}
