/// Errors raised while turning a raw email into circuit inputs.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("no DKIM-Signature header")]
    NoSignatureHeader,
    #[error("multiple DKIM-Signature headers")]
    MultipleSignatureHeaders,
    #[error("header `{0}` not found")]
    MissingHeader(String),
    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),
    #[error("unknown canonicalization `{0}`")]
    UnknownCanonicalization(String),
    #[error("missing tag `{0}=`")]
    MissingTag(&'static str),
    #[error("invalid base64 in tag `{tag}=`: {source}")]
    InvalidBase64 {
        tag: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error("pubkey not found")]
    PubkeyNotFound,
    #[error("key revoked")]
    KeyRevoked,
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("header format error: {0}")]
    HeaderFormatError(String),
    #[error("body hash does not match the canonicalized body")]
    BodyHashMismatch,
    #[error("mail parse error: {0}")]
    Mail(#[from] mailparse::MailParseError),
    #[error("dns error: {0}")]
    Dns(String),
}
