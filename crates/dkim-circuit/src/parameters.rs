use std::{fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{circuit::rsa::MIN_KEY_BYTES, error::CircuitError, CircuitResult};

/// How the header hash is computed over its padded slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStrategy {
    /// one candidate hash per start offset, selected by the padding
    #[default]
    Windowed,
    /// shift the real bytes to the front and select the final block
    Shifted,
}

/// The signed header bound by the public input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistinguishedHeader {
    #[default]
    From,
    To,
}

impl DistinguishedHeader {
    pub fn name(&self) -> &'static str {
        match self {
            DistinguishedHeader::From => "from",
            DistinguishedHeader::To => "to",
        }
    }
}

impl FromStr for DistinguishedHeader {
    type Err = CircuitError;

    fn from_str(s: &str) -> CircuitResult<Self> {
        match s.to_lowercase().as_str() {
            "from" => Ok(DistinguishedHeader::From),
            "to" => Ok(DistinguishedHeader::To),
            other => Err(CircuitError::InvalidParameters(format!(
                "distinguished header must be `from` or `to`, got `{}`",
                other
            ))),
        }
    }
}

fn default_binding_key_bytes() -> usize {
    512
}

fn default_exponent_bits() -> usize {
    17
}

/// The circuit topology. Every witness proved against one key must use the same
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitParameters {
    pub prefix_capacity: usize,
    pub specify_capacity: usize,
    pub suffix_capacity: usize,
    pub sig_prefix_capacity: usize,
    pub sig_suffix_capacity: usize,
    pub rsa_key_bytes: usize,
    /// width N and E are left-padded to inside the binding hash
    #[serde(default = "default_binding_key_bytes")]
    pub binding_key_bytes: usize,
    #[serde(default = "default_exponent_bits")]
    pub exponent_bits: usize,
    #[serde(default)]
    pub header_hash_strategy: HashStrategy,
    #[serde(default)]
    pub distinguished_header: DistinguishedHeader,
    /// check the body against `bh=` while preparing the witness
    #[serde(default)]
    pub verify_body_hash: bool,
}

impl CircuitParameters {
    pub fn from_json_file(path: impl AsRef<Path>) -> CircuitResult<Self> {
        let data = fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&data)?;
        params.validate()?;

        Ok(params)
    }

    pub fn validate(&self) -> CircuitResult<()> {
        let capacities = [
            ("prefixCapacity", self.prefix_capacity),
            ("specifyCapacity", self.specify_capacity),
            ("suffixCapacity", self.suffix_capacity),
            ("sigPrefixCapacity", self.sig_prefix_capacity),
            ("sigSuffixCapacity", self.sig_suffix_capacity),
        ];
        for (name, capacity) in capacities {
            if capacity == 0 {
                return Err(CircuitError::InvalidParameters(format!("{} is zero", name)));
            }
        }

        if self.rsa_key_bytes < MIN_KEY_BYTES {
            return Err(CircuitError::KeyTooSmall {
                key_bytes: self.rsa_key_bytes,
                required: MIN_KEY_BYTES,
            });
        }
        if self.rsa_key_bytes % 8 != 0 {
            return Err(CircuitError::InvalidParameters(format!(
                "rsaKeyBytes {} is not a multiple of 8",
                self.rsa_key_bytes
            )));
        }
        if self.rsa_key_bytes > self.binding_key_bytes {
            return Err(CircuitError::InvalidParameters(format!(
                "rsaKeyBytes {} exceeds bindingKeyBytes {}",
                self.rsa_key_bytes, self.binding_key_bytes
            )));
        }
        if !(1..=64).contains(&self.exponent_bits) {
            return Err(CircuitError::InvalidParameters(format!(
                "exponentBits {} not in 1..=64",
                self.exponent_bits
            )));
        }

        Ok(())
    }

    /// bytes the exponent occupies in circuit
    pub fn exponent_bytes(&self) -> usize {
        (self.exponent_bits + 7) / 8
    }

    /// capacity of the concatenated header
    pub fn header_capacity(&self) -> usize {
        self.prefix_capacity
            + self.specify_capacity
            + self.suffix_capacity
            + self.sig_prefix_capacity
            + crate::circuit::base64::BODY_HASH_BASE64_LEN
            + self.sig_suffix_capacity
    }
}

/// Capacities sized for the signed headers of common mail providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTemplate {
    Gmail,
    Outlook,
    Foxmail,
    ICloud,
}

impl MailTemplate {
    pub fn parameters(&self) -> CircuitParameters {
        // (prefix, specify, suffix, sig prefix, sig suffix, key bytes)
        let (prefix, specify, suffix, sig_prefix, sig_suffix, key) = match self {
            MailTemplate::Gmail => (320, 128, 320, 320, 16, 256),
            MailTemplate::Outlook => (384, 128, 384, 256, 16, 256),
            MailTemplate::Foxmail => (192, 128, 192, 192, 64, 128),
            MailTemplate::ICloud => (384, 128, 384, 256, 128, 256),
        };

        CircuitParameters {
            prefix_capacity: prefix,
            specify_capacity: specify,
            suffix_capacity: suffix,
            sig_prefix_capacity: sig_prefix,
            sig_suffix_capacity: sig_suffix,
            rsa_key_bytes: key,
            binding_key_bytes: default_binding_key_bytes(),
            exponent_bits: default_exponent_bits(),
            header_hash_strategy: HashStrategy::Shifted,
            distinguished_header: DistinguishedHeader::From,
            verify_body_hash: false,
        }
    }
}

impl FromStr for MailTemplate {
    type Err = CircuitError;

    fn from_str(s: &str) -> CircuitResult<Self> {
        match s.to_lowercase().as_str() {
            "gmail" => Ok(MailTemplate::Gmail),
            "outlook" => Ok(MailTemplate::Outlook),
            "foxmail" => Ok(MailTemplate::Foxmail),
            "icloud" => Ok(MailTemplate::ICloud),
            other => Err(CircuitError::InvalidParameters(format!(
                "unknown mail template `{}`",
                other
            ))),
        }
    }
}
