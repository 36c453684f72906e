use base64::{engine::general_purpose, Engine as _};

use cfdkim::{parse_tag_list, Tag};

use crate::{canonicalization::Canon, email::HeaderField, error::ParserError, ParserResult};

pub const DKIM_SIGNATURE_HEADER: &str = "dkim-signature";

/// a parsed DKIM-Signature header (rsa-sha256 only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DkimSignature {
    /// the header field as it appeared in the message
    pub raw_header: HeaderField,
    /// the header field with the value of `b=` removed
    pub trimmed_header: String,

    pub version: Option<String>,
    pub domain: String,
    pub selector: String,
    pub header_canon: Canon,
    pub body_canon: Canon,
    /// `h=`, lowercased, in signing order
    pub signed_headers: Vec<String>,
    pub body_hash: Vec<u8>,
    pub signature: Vec<u8>,
    pub body_length: Option<usize>,
    pub timestamp: Option<u64>,
    pub expiration: Option<u64>,
}

pub fn is_signature_header(header: &HeaderField) -> bool {
    header.is_named(DKIM_SIGNATURE_HEADER)
}

fn strip_whitespace(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
        .collect()
}

pub(crate) fn decode_base64(tag: &'static str, value: &str) -> ParserResult<Vec<u8>> {
    general_purpose::STANDARD
        .decode(strip_whitespace(value))
        .map_err(|source| ParserError::InvalidBase64 { tag, source })
}

/// the `name=value` pairs of a DKIM tag list
pub(crate) fn tag_list(what: &str, value: &str) -> ParserResult<Vec<Tag>> {
    let (rest, tags) = parse_tag_list(value)
        .map_err(|err| ParserError::HeaderFormatError(format!("{} tags: {}", what, err)))?;
    if !rest.trim().is_empty() {
        return Err(ParserError::HeaderFormatError(format!(
            "{} tags: trailing `{}`",
            what,
            rest.trim()
        )));
    }

    Ok(tags)
}

fn parse_canon(value: &str) -> ParserResult<(Canon, Canon)> {
    match value.split_once('/') {
        Some((header, body)) => Ok((header.parse()?, body.parse()?)),
        None => Ok((value.parse()?, Canon::Simple)),
    }
}

// the raw field with the value of `b=` cut out, `b=` itself kept
fn trim_signature(raw: &str) -> ParserResult<String> {
    let colon = raw
        .find(':')
        .ok_or_else(|| ParserError::HeaderFormatError("no colon in DKIM-Signature".into()))?;

    let pairs: Vec<&str> = raw[colon + 1..]
        .split(';')
        .map(|pair| match pair.find('=') {
            Some(idx) if pair[..idx].trim() == "b" => &pair[..idx + 1],
            _ => pair,
        })
        .collect();

    Ok(format!("{}{}", &raw[..colon + 1], pairs.join(";")))
}

impl DkimSignature {
    pub fn parse(header: &HeaderField) -> ParserResult<Self> {
        if !is_signature_header(header) {
            return Err(ParserError::NoSignatureHeader);
        }

        let mut version = None;
        let mut algorithm = None;
        let mut canon = None;
        let mut domain = None;
        let mut selector = None;
        let mut signed_headers = None;
        let mut body_hash = None;
        let mut signature = None;
        let mut body_length = None;
        let mut timestamp = None;
        let mut expiration = None;

        for tag in tag_list("DKIM-Signature", &header.value)? {
            let v = tag.value.as_str();
            match tag.name.as_str() {
                "v" => version = Some(v.to_string()),
                "a" => algorithm = Some(v.to_string()),
                "c" => canon = Some(parse_canon(v)?),
                "d" => domain = Some(v.to_string()),
                "s" => selector = Some(v.to_string()),
                "h" => {
                    signed_headers = Some(
                        v.split(':')
                            .map(|name| name.trim().to_lowercase())
                            .filter(|name| !name.is_empty())
                            .collect::<Vec<_>>(),
                    )
                }
                "bh" => body_hash = Some(decode_base64("bh", v)?),
                "b" => signature = Some(decode_base64("b", v)?),
                "l" => body_length = v.parse().ok(),
                "t" => timestamp = v.parse().ok(),
                "x" => expiration = v.parse().ok(),
                _ => {}
            }
        }

        let algorithm = algorithm.ok_or(ParserError::MissingTag("a"))?;
        if algorithm != "rsa-sha256" {
            return Err(ParserError::UnknownAlgorithm(algorithm));
        }
        let (header_canon, body_canon) = canon.ok_or(ParserError::MissingTag("c"))?;

        Ok(Self {
            raw_header: header.clone(),
            trimmed_header: trim_signature(&header.raw)?,
            version,
            domain: domain.ok_or(ParserError::MissingTag("d"))?,
            selector: selector.ok_or(ParserError::MissingTag("s"))?,
            header_canon,
            body_canon,
            signed_headers: signed_headers.ok_or(ParserError::MissingTag("h"))?,
            body_hash: body_hash.ok_or(ParserError::MissingTag("bh"))?,
            signature: signature.ok_or(ParserError::MissingTag("b"))?,
            body_length,
            timestamp,
            expiration,
        })
    }

    /// DNS name of the key record
    pub fn txt_record_name(&self) -> String {
        format!("{}._domainkey.{}.", self.selector, self.domain)
    }

    /// the trimmed header canonicalized, without the trailing CRLF. this is the
    /// last piece of the signed data
    pub fn canonical_trimmed_header(&self) -> ParserResult<String> {
        let trimmed = crate::email::parse_email(&self.trimmed_header)?
            .headers
            .into_iter()
            .next()
            .ok_or_else(|| ParserError::HeaderFormatError("empty DKIM-Signature".into()))?;
        let canonical =
            crate::canonicalization::canonicalize_header(self.header_canon, &trimmed);

        Ok(canonical
            .strip_suffix("\r\n")
            .unwrap_or(&canonical)
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::parse_email;

    fn parse(raw: &str) -> ParserResult<DkimSignature> {
        DkimSignature::parse(&parse_email(raw)?.headers[0])
    }

    const HEADER: &str = "DKIM-Signature: v=1; a=rsa-sha256; c=relaxed/relaxed;\r\n        d=example.com; s=sel; t=1700000000;\r\n        h=From:To : Subject;\r\n        bh=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=;\r\n        b=AAEC\r\n         AwQ=\r\n";

    #[test]
    fn test_parse_signature() {
        let sig = parse(HEADER).unwrap();
        assert_eq!(sig.domain, "example.com");
        assert_eq!(sig.selector, "sel");
        assert_eq!(sig.header_canon, Canon::Relaxed);
        assert_eq!(sig.body_canon, Canon::Relaxed);
        assert_eq!(sig.signed_headers, vec!["from", "to", "subject"]);
        assert_eq!(sig.body_hash.len(), 32);
        assert_eq!(sig.signature, vec![0, 1, 2, 3, 4]);
        assert_eq!(sig.timestamp, Some(1_700_000_000));
        assert_eq!(sig.txt_record_name(), "sel._domainkey.example.com.");
        assert!(sig.trimmed_header.ends_with("b="));

        assert_eq!(
            sig.canonical_trimmed_header().unwrap(),
            "dkim-signature:v=1; a=rsa-sha256; c=relaxed/relaxed; d=example.com; s=sel; t=1700000000; h=From:To : Subject; bh=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=; b="
        );
    }

    #[test]
    fn test_default_body_canon() {
        let header = "DKIM-Signature: a=rsa-sha256; c=relaxed; d=x; s=y; h=from; bh=AA==; b=AA==";
        let sig = parse(header).unwrap();
        assert_eq!(sig.header_canon, Canon::Relaxed);
        assert_eq!(sig.body_canon, Canon::Simple);
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            (
                "DKIM-Signature: a=rsa-sha1; c=relaxed; d=x; s=y; h=from; bh=AA==; b=AA==",
                "unknown algorithm",
            ),
            (
                "DKIM-Signature: c=relaxed; d=x; s=y; h=from; bh=AA==; b=AA==",
                "missing tag `a=`",
            ),
            (
                "DKIM-Signature: a=rsa-sha256; c=loose; d=x; s=y; h=from; bh=AA==; b=AA==",
                "unknown canonicalization",
            ),
            (
                "DKIM-Signature: a=rsa-sha256; c=relaxed; d=x; s=y; h=from; bh=AA==; b=!!",
                "invalid base64",
            ),
            (
                "DKIM-Signature: a=rsa-sha256; c=relaxed; d=x; h=from; bh=AA==; b=AA==",
                "missing tag `s=`",
            ),
        ];
        for (header, message) in cases {
            let err = parse(header).unwrap_err();
            println!("{}", err);
            assert!(err.to_string().starts_with(message), "{}", err);
        }
    }

    #[test]
    fn test_not_a_signature() {
        assert!(matches!(
            parse("From: a@b.c\r\n"),
            Err(ParserError::NoSignatureHeader)
        ));
        let err = parse("DKIM-Signature: a=rsa-sha256; garbage; d=x\r\n").unwrap_err();
        assert!(matches!(err, ParserError::HeaderFormatError(_)), "{}", err);
    }
}
