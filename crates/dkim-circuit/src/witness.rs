use std::{fs, path::Path};

use base64::{engine::general_purpose, Engine as _};
use composer::ark_bn254::Fr;
use email_parser::{
    fixup_newlines, parse_dkim_message, resolve_public_key,
    types::{deserialize_hex_string, serialize_hex_string},
    DkimMessage, DkimPublicKey, DnsClient,
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    circuit::{dkim::binding_digest, rsa::verify_pkcs1v15_sha256_native},
    error::CircuitError,
    parameters::CircuitParameters,
    types::PaddedBytes,
    utils::{digest_to_field, left_pad, strip_leading_zeros},
    CircuitResult,
};

/// Everything one proving run needs, prepared off-circuit from a raw email and the
/// signer's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimWitness {
    pub domain: String,
    pub selector: String,

    pub prefix: PaddedBytes,
    pub specify: PaddedBytes,
    pub suffix: PaddedBytes,
    pub sig_prefix: PaddedBytes,
    pub sig_suffix: PaddedBytes,

    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub body_hash: Vec<u8>,
    /// `b=`, `rsaKeyBytes` long
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub signature: Vec<u8>,
    /// `rsaKeyBytes` long
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub modulus: Vec<u8>,
    /// left-padded to the exponent width of the circuit
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub exponent: Vec<u8>,
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub header_hash: Vec<u8>,
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub binding_hash: Vec<u8>,
}

impl DkimWitness {
    /// prepare from a raw email and the TXT record of its signing key
    pub fn prepare(raw: &str, txt_record: &str, params: &CircuitParameters) -> CircuitResult<Self> {
        let msg = parse_dkim_message(&fixup_newlines(raw), false)?;
        let key = DkimPublicKey::parse(txt_record)?;

        Self::from_message(&msg, &key, params)
    }

    /// prepare from a raw email, looking the key up by the signature's `s=` and `d=`
    pub fn prepare_with_dns<C: DnsClient + ?Sized>(
        raw: &str,
        client: &C,
        params: &CircuitParameters,
    ) -> CircuitResult<Self> {
        let msg = parse_dkim_message(&fixup_newlines(raw), false)?;
        let key = resolve_public_key(client, &msg.signature)?;

        Self::from_message(&msg, &key, params)
    }

    pub fn from_message(
        msg: &DkimMessage,
        key: &DkimPublicKey,
        params: &CircuitParameters,
    ) -> CircuitResult<Self> {
        params.validate()?;

        let modulus = strip_leading_zeros(&key.modulus).to_vec();
        if modulus.len() != params.rsa_key_bytes {
            return Err(CircuitError::KeySizeMismatch {
                what: "modulus",
                expected: params.rsa_key_bytes,
                actual: modulus.len(),
            });
        }
        let signature = left_pad(
            strip_leading_zeros(&msg.signature.signature),
            params.rsa_key_bytes,
            "signature",
        )?;
        let exponent = strip_leading_zeros(&key.exponent);
        if BigUint::from_bytes_be(exponent).bits() > params.exponent_bits as u64 {
            return Err(CircuitError::ExponentTooLarge {
                bits: params.exponent_bits,
            });
        }
        let exponent = left_pad(exponent, params.exponent_bytes(), "exponent")?;

        let headers = msg.split_at_header(params.distinguished_header.name())?;
        let sig_split = msg.split_signature_header()?;
        if params.verify_body_hash {
            msg.verify_body_hash()?;
        }

        let body_hash = msg.signature.body_hash.clone();
        if body_hash.len() != 32 {
            return Err(CircuitError::KeySizeMismatch {
                what: "body hash",
                expected: 32,
                actual: body_hash.len(),
            });
        }

        let witness_without_hashes = Self {
            domain: msg.signature.domain.clone(),
            selector: msg.signature.selector.clone(),
            prefix: PaddedBytes::new(&headers.prefix, params.prefix_capacity, "prefix")?,
            specify: PaddedBytes::new(&headers.specify, params.specify_capacity, "specify")?,
            suffix: PaddedBytes::new(&headers.suffix, params.suffix_capacity, "suffix")?,
            sig_prefix: PaddedBytes::new(
                &sig_split.sig_prefix,
                params.sig_prefix_capacity,
                "sig prefix",
            )?,
            sig_suffix: PaddedBytes::new(
                &sig_split.sig_suffix,
                params.sig_suffix_capacity,
                "sig suffix",
            )?,
            body_hash,
            signature,
            modulus,
            exponent,
            header_hash: vec![],
            binding_hash: vec![],
        };

        // the regions must rebuild exactly the signed data
        let header_hash = Sha256::digest(witness_without_hashes.header_bytes()).to_vec();
        if header_hash != msg.header_hash() {
            return Err(CircuitError::InvalidParameters(
                "header regions do not rebuild the signed data".into(),
            ));
        }

        let binding_hash = binding_digest(
            &witness_without_hashes.modulus,
            &witness_without_hashes.exponent,
            &witness_without_hashes.body_hash,
            witness_without_hashes.specify.real_bytes(),
            params,
        )?;
        let witness = Self {
            header_hash,
            binding_hash,
            ..witness_without_hashes
        };
        witness.verify_native()?;

        log::debug!(
            "witness for d={} s={}: prefix {}, specify {}, suffix {}, sig prefix {}, sig suffix {} bytes",
            witness.domain,
            witness.selector,
            witness.prefix.real_bytes().len(),
            witness.specify.real_bytes().len(),
            witness.suffix.real_bytes().len(),
            witness.sig_prefix.real_bytes().len(),
            witness.sig_suffix.real_bytes().len(),
        );

        Ok(witness)
    }

    /// Empty regions and a zero key. Synthesizes the same circuit shape as any real
    /// witness for `params`, though not a satisfiable one.
    pub fn placeholder(params: &CircuitParameters) -> Self {
        Self {
            domain: String::new(),
            selector: String::new(),
            prefix: PaddedBytes::empty(params.prefix_capacity),
            specify: PaddedBytes::empty(params.specify_capacity),
            suffix: PaddedBytes::empty(params.suffix_capacity),
            sig_prefix: PaddedBytes::empty(params.sig_prefix_capacity),
            sig_suffix: PaddedBytes::empty(params.sig_suffix_capacity),
            body_hash: vec![0; 32],
            signature: vec![0; params.rsa_key_bytes],
            modulus: vec![0; params.rsa_key_bytes],
            exponent: vec![0; params.exponent_bytes()],
            header_hash: vec![0; 32],
            binding_hash: vec![0; 32],
        }
    }

    /// the signed header data the regions spell out
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut data = self.prefix.real_bytes().to_vec();
        data.extend_from_slice(self.specify.real_bytes());
        data.extend_from_slice(self.suffix.real_bytes());
        data.extend_from_slice(self.sig_prefix.real_bytes());
        data.extend_from_slice(general_purpose::STANDARD.encode(&self.body_hash).as_bytes());
        data.extend_from_slice(self.sig_suffix.real_bytes());
        data
    }

    /// RSA check of the header hash outside the circuit
    pub fn verify_native(&self) -> CircuitResult<()> {
        verify_pkcs1v15_sha256_native(
            &self.signature,
            &self.exponent,
            &self.modulus,
            &self.header_hash,
        )
    }

    /// the public input of the circuit
    pub fn public_input(&self) -> Fr {
        digest_to_field(&self.binding_hash)
    }

    /// every region and key field sized as `params` expects
    pub fn check_shape(&self, params: &CircuitParameters) -> CircuitResult<()> {
        let regions = [
            ("prefix", &self.prefix, params.prefix_capacity),
            ("specify", &self.specify, params.specify_capacity),
            ("suffix", &self.suffix, params.suffix_capacity),
            ("sig prefix", &self.sig_prefix, params.sig_prefix_capacity),
            ("sig suffix", &self.sig_suffix, params.sig_suffix_capacity),
        ];
        for (region, padded, capacity) in regions {
            if padded.capacity() != capacity {
                return Err(CircuitError::InvalidParameters(format!(
                    "{} has capacity {}, the circuit expects {}",
                    region,
                    padded.capacity(),
                    capacity
                )));
            }
        }

        let fields = [
            ("signature", self.signature.len(), params.rsa_key_bytes),
            ("modulus", self.modulus.len(), params.rsa_key_bytes),
            ("exponent", self.exponent.len(), params.exponent_bytes()),
            ("body hash", self.body_hash.len(), 32),
            ("header hash", self.header_hash.len(), 32),
            ("binding hash", self.binding_hash.len(), 32),
        ];
        for (what, actual, expected) in fields {
            if actual != expected {
                return Err(CircuitError::KeySizeMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }

        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> CircuitResult<()> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> CircuitResult<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}
