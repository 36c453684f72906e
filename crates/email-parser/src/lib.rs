//! Off-circuit preparation of DKIM signed emails: splitting a raw message into
//! headers and body, parsing the DKIM-Signature header and the key record,
//! canonicalizing and selecting the signed headers.
#![warn(future_incompatible, nonstandard_style, rust_2018_idioms)]

use error::ParserError;

pub mod canonicalization;
pub mod dns;
pub mod email;
pub mod error;
pub mod parser;
pub mod pubkey;
pub mod signature;
pub mod types;

pub use canonicalization::Canon;
pub use dns::{resolve_public_key, DnsClient, StaticDnsClient};
pub use email::{fixup_newlines, parse_email, Email, HeaderField};
pub use parser::{extract_signed_headers, find_signature_header, parse_dkim_message, DkimMessage, SignedHeader};
pub use types::{HeaderSplit, SignatureSplit};
pub use pubkey::DkimPublicKey;
pub use signature::DkimSignature;

pub type ParserResult<T> = Result<T, ParserError>;
