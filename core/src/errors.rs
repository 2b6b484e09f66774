use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("unknown {kind} '{code}'")]
    UnknownCode { kind: &'static str, code: String },
    #[error("invalid regular expression /{pattern}/: {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
