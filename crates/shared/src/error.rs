use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed sentinel: expected {expected} fields, got {actual} in {raw:?}")]
    MalformedSentinel {
        expected: usize,
        actual: usize,
        raw: String,
    },
    #[error("unknown form field {0:?}")]
    UnknownFormField(String),
}
