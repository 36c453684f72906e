//! DKIM signature verification as an arithmetic circuit.
//!
//! Header regions of variable length travel in fixed-capacity padded slices, are
//! concatenated and hashed in circuit, and the header hash is checked against an
//! RSA PKCS#1 v1.5 signature with emulated big-integer arithmetic. The only public
//! input is a binding hash over the key, the body hash and the distinguished header.
#![warn(future_incompatible, nonstandard_style, rust_2018_idioms)]

use error::CircuitError;

pub mod circuit;
pub mod error;
pub mod parameters;
pub mod types;
pub mod utils;
pub mod witness;

pub use circuit::dkim::{binding_public_input, DkimCircuit};
pub use parameters::{CircuitParameters, DistinguishedHeader, HashStrategy, MailTemplate};
pub use types::PaddedBytes;
pub use witness::DkimWitness;

pub type CircuitResult<T> = Result<T, CircuitError>;
