//! A PLONK-style arithmetic circuit composer of configurable width.
//!
//! Gates are evaluated against the witness while they are inserted, so a
//! finished [`Composer`] can report whether the assignment satisfies every
//! constraint without running a prover. The structure of the circuit (which
//! gates touch which wires with which selectors) is folded into a digest, so
//! two syntheses with the same parameters can be compared for shape.
#![warn(future_incompatible, nonstandard_style, rust_2018_idioms)]
#![allow(clippy::op_ref, clippy::suspicious_op_assign_impl)]
#![forbid(unsafe_code)]

use ark_std::collections::BTreeMap as Map;

pub mod composer;
pub use composer::{Composer, ComposerConfig, Table, UnsatisfiedGate, Variable};

pub mod bits;
pub mod selectors;
pub mod sha256;
mod utils;

pub use utils::*;

pub use ark_bn254;
pub use ark_ff;
pub use ark_std;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no such table")]
    NoSuchTable,
    #[error("gate `{gate}` at row {row} is not satisfied ({total} failing gates in total)")]
    Unsatisfied {
        row: usize,
        gate: String,
        total: usize,
    },
}

pub type ComposerResult<T> = Result<T, Error>;
