use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not enough elements selected: need at least {needed}, got {got}")]
    InsufficientSelection { needed: usize, got: usize },

    #[error("invalid value {value:?} for {option}; valid values: {expected}")]
    InvalidOption {
        option: &'static str,
        value: String,
        expected: String,
    },

    #[error("invalid unit expression for {option}: {value:?} (expected <number><px|mm|cm|m|in>)")]
    InvalidUnit { option: &'static str, value: String },

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("could not compute a bounding box for element {0:?}")]
    MissingBoundingBox(String),

    #[error("no element with id {0:?} in the document")]
    UnknownElement(String),

    #[error("transform is not invertible: {0}")]
    DegenerateTransform(String),

    #[error("no {0} ids left above the largest one in the document")]
    IdSpaceExhausted(&'static str),

    #[error("invalid config file: {0}")]
    Config(String),

    #[error("failed to parse svg xml: {0}")]
    Xml(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_option(option: &'static str, value: &str, expected: &[&str]) -> Self {
        Self::InvalidOption {
            option,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}
