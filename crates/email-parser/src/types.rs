use serde::{de, Deserialize, Serialize, Serializer};

/// The signed header fields around the distinguished one, canonicalized and
/// concatenated: `prefix ∥ specify ∥ suffix` is the header part of the signed data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSplit {
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub prefix: Vec<u8>,
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub specify: Vec<u8>,
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub suffix: Vec<u8>,
}

/// The canonical trimmed DKIM-Signature header cut around the `bh=` value:
/// `sig_prefix ∥ base64(body hash) ∥ sig_suffix`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSplit {
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub sig_prefix: Vec<u8>,
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub sig_suffix: Vec<u8>,
}

pub fn deserialize_hex_string<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let s: String = de::Deserialize::deserialize(deserializer)?;
    hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| de::Error::custom(format!("deserialize call failed:{:?}", e)))
}

pub fn serialize_hex_string<S>(v: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut s = String::from("0x");
    s += &hex::encode(v);
    serializer.serialize_str(&s)
}
