use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ParserError, pubkey::DkimPublicKey, signature::DkimSignature, ParserResult};

/// A DNSClient can look up TXT records.
pub trait DnsClient {
    fn lookup_txt(&self, name: &str) -> ParserResult<Vec<String>>;
}

/// TXT records held in memory, keyed by fully qualified name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticDnsClient {
    records: HashMap<String, Vec<String>>,
}

impl StaticDnsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, record: &str) {
        self.records
            .entry(normalize_name(name))
            .or_insert_with(Vec::new)
            .push(record.to_string());
    }

    /// a JSON object mapping names to lists of TXT strings
    pub fn from_json_file(path: impl AsRef<Path>) -> ParserResult<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| ParserError::Dns(e.to_string()))?;
        let client: Self =
            serde_json::from_str(&data).map_err(|e| ParserError::Dns(e.to_string()))?;

        Ok(Self {
            records: client
                .records
                .into_iter()
                .map(|(name, records)| (normalize_name(&name), records))
                .collect(),
        })
    }
}

// names compare case-insensitively, with the trailing dot
fn normalize_name(name: &str) -> String {
    let name = name.to_lowercase();
    if name.ends_with('.') {
        name
    } else {
        format!("{}.", name)
    }
}

impl DnsClient for StaticDnsClient {
    fn lookup_txt(&self, name: &str) -> ParserResult<Vec<String>> {
        self.records
            .get(&normalize_name(name))
            .cloned()
            .ok_or_else(|| ParserError::Dns(format!("hostname {} not found", name)))
    }
}

/// the first TXT record of the signature's key name that parses as a DKIM key
pub fn resolve_public_key<C: DnsClient + ?Sized>(
    client: &C,
    signature: &DkimSignature,
) -> ParserResult<DkimPublicKey> {
    let name = signature.txt_record_name();
    let records = client.lookup_txt(&name)?;

    let mut last_error = ParserError::PubkeyNotFound;
    for record in records {
        match DkimPublicKey::parse(&record) {
            Ok(key) => {
                log::debug!("{}: {}-byte RSA key", name, key.key_bytes());
                return Ok(key);
            }
            Err(e) => {
                log::debug!("{}: skipping record: {}", name, e);
                last_error = e;
            }
        }
    }

    Err(last_error)
}
