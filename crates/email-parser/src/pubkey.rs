use rsa::{
    pkcs1::DecodeRsaPublicKey, pkcs8::DecodePublicKey, traits::PublicKeyParts, RsaPublicKey,
};

use crate::{
    error::ParserError,
    signature::{decode_base64, tag_list},
    ParserResult,
};

/// RSA key published in a DKIM key record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DkimPublicKey {
    /// modulus, big-endian, without leading zeros
    pub modulus: Vec<u8>,
    /// public exponent, big-endian, without leading zeros
    pub exponent: Vec<u8>,
}

impl DkimPublicKey {
    /// parse a `v=DKIM1; k=rsa; p=...` TXT record
    pub fn parse(record: &str) -> ParserResult<Self> {
        let mut key = None;
        for tag in tag_list("key record", record)? {
            match tag.name.as_str() {
                "k" if tag.value != "rsa" => {
                    return Err(ParserError::InvalidPublicKey(format!(
                        "key type `{}`",
                        tag.value
                    )))
                }
                "p" => key = Some(tag.value),
                _ => {}
            }
        }

        let encoded = key.ok_or(ParserError::PubkeyNotFound)?;
        let der = decode_base64("p", &encoded)?;
        if der.is_empty() {
            return Err(ParserError::KeyRevoked);
        }

        Self::from_der(&der)
    }

    /// SubjectPublicKeyInfo DER, or a bare PKCS#1 RSAPublicKey
    pub fn from_der(der: &[u8]) -> ParserResult<Self> {
        let key = RsaPublicKey::from_public_key_der(der)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(der))
            .map_err(|e| ParserError::InvalidPublicKey(e.to_string()))?;

        Ok(Self {
            modulus: key.n().to_bytes_be(),
            exponent: key.e().to_bytes_be(),
        })
    }

    /// size of the modulus in bytes
    pub fn key_bytes(&self) -> usize {
        self.modulus.len()
    }
}
