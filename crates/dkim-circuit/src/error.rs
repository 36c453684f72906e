use std::io;

use email_parser::error::ParserError;

/// Error thrown while preparing or assembling the circuit.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Composer(#[from] composer::Error),
    #[error("{region}: {len} bytes do not fit in capacity {capacity}")]
    CapacityOverflow {
        region: &'static str,
        len: usize,
        capacity: usize,
    },
    #[error("RSA key of {key_bytes} bytes is too small, at least {required} bytes are needed")]
    KeyTooSmall { key_bytes: usize, required: usize },
    #[error("expected a {expected}-byte {what}, got {actual} bytes")]
    KeySizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("public exponent does not fit in {bits} bits")]
    ExponentTooLarge { bits: usize },
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("signature does not verify against the public key")]
    SignatureMismatch,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
