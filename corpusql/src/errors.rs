use corpusql_core::errors::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Error, Debug, strum_macros::IntoStaticStr)]
#[non_exhaustive]
pub enum QueryError {
    /// Illegal parameters when building a node.
    #[error("invalid {node}: {desc}")]
    Construction { node: &'static str, desc: String },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Building an automaton for the query exhausted the configured limits.
    /// The caller may simplify the pattern and try again.
    #[error("pattern too large: {0}")]
    PatternTooLarge(String),
    #[error("cannot serialize to corpus query language: {0}")]
    UnsupportedSerialization(String),
    #[error("invalid JSON query: {0}")]
    InvalidJson(String),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeserializer(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QueryError {
    pub(crate) fn construction<S: Into<String>>(node: &'static str, desc: S) -> QueryError {
        QueryError::Construction {
            node,
            desc: desc.into(),
        }
    }
}
