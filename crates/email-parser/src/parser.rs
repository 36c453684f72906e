use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::{
    canonicalization::{canonicalize_body, canonicalize_header},
    email::{parse_email, HeaderField},
    error::ParserError,
    signature::{is_signature_header, DkimSignature},
    types::{HeaderSplit, SignatureSplit},
    ParserResult,
};

/// One header field named in `h=`, in signing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeader {
    /// lowercased field name
    pub name: String,
    /// canonical form, including its CRLF
    pub canonical: String,
}

/// A DKIM signed message with everything the circuit consumes extracted.
#[derive(Debug, Clone)]
pub struct DkimMessage {
    pub signature: DkimSignature,
    pub signed_headers: Vec<SignedHeader>,
    /// canonical trimmed DKIM-Signature header, no trailing CRLF
    pub trimmed_header: String,
    pub body: String,
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// the single DKIM-Signature header of a message
pub fn find_signature_header(headers: &[HeaderField]) -> ParserResult<&HeaderField> {
    let mut found = headers.iter().filter(|header| is_signature_header(header));
    let header = found.next().ok_or(ParserError::NoSignatureHeader)?;
    if found.next().is_some() {
        return Err(ParserError::MultipleSignatureHeaders);
    }

    Ok(header)
}

/// Pick the header instances named in `h=`. Repeated names consume instances
/// from the bottom of the header block upwards. A name with no instance left is
/// skipped, or rejected with `strict`.
pub fn extract_signed_headers<'a>(
    headers: &'a [HeaderField],
    names: &[String],
    strict: bool,
) -> ParserResult<Vec<(String, &'a HeaderField)>> {
    let mut used = vec![false; headers.len()];
    let mut selected = Vec::with_capacity(names.len());

    for name in names {
        let found = headers.iter().enumerate().rev().find(|(i, header)| {
            !used[*i] && !is_signature_header(header) && header.is_named(name)
        });
        match found {
            Some((i, header)) => {
                used[i] = true;
                selected.push((name.clone(), header));
            }
            None if strict => return Err(ParserError::MissingHeader(name.clone())),
            None => log::warn!("signed header `{}` not present, skipped", name),
        }
    }

    Ok(selected)
}

/// Parse a raw message and prepare its DKIM signed data.
pub fn parse_dkim_message(raw: &str, strict: bool) -> ParserResult<DkimMessage> {
    let email = parse_email(raw)?;
    let signature = DkimSignature::parse(find_signature_header(&email.headers)?)?;

    let signed_headers = extract_signed_headers(&email.headers, &signature.signed_headers, strict)?
        .into_iter()
        .map(|(name, header)| SignedHeader {
            name,
            canonical: canonicalize_header(signature.header_canon, header),
        })
        .collect::<Vec<_>>();
    let trimmed_header = signature.canonical_trimmed_header()?;

    log::debug!(
        "d={} s={}: {} signed headers",
        signature.domain,
        signature.selector,
        signed_headers.len()
    );

    Ok(DkimMessage {
        signature,
        signed_headers,
        trimmed_header,
        body: email.body,
    })
}

impl DkimMessage {
    /// the bytes covered by the signature
    pub fn signed_data(&self) -> Vec<u8> {
        let mut data: Vec<u8> = self
            .signed_headers
            .iter()
            .flat_map(|header| header.canonical.bytes())
            .collect();
        data.extend_from_slice(self.trimmed_header.as_bytes());
        data
    }

    pub fn header_hash(&self) -> Vec<u8> {
        Sha256::digest(self.signed_data()).to_vec()
    }

    /// the body as hashed by `bh=`, cut at `l=` when present
    pub fn canonical_body(&self) -> Vec<u8> {
        let mut body = canonicalize_body(self.signature.body_canon, &self.body).into_bytes();
        if let Some(len) = self.signature.body_length {
            body.truncate(len);
        }
        body
    }

    pub fn verify_body_hash(&self) -> ParserResult<()> {
        if Sha256::digest(self.canonical_body()).as_slice() != self.signature.body_hash.as_slice() {
            return Err(ParserError::BodyHashMismatch);
        }
        Ok(())
    }

    /// Cut the signed headers around the first one named `name`.
    pub fn split_at_header(&self, name: &str) -> ParserResult<HeaderSplit> {
        let index = self
            .signed_headers
            .iter()
            .position(|header| header.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ParserError::MissingHeader(name.to_string()))?;

        let concat = |headers: &[SignedHeader]| -> Vec<u8> {
            headers
                .iter()
                .flat_map(|header| header.canonical.bytes())
                .collect()
        };

        Ok(HeaderSplit {
            prefix: concat(&self.signed_headers[..index]),
            specify: self.signed_headers[index].canonical.as_bytes().to_vec(),
            suffix: concat(&self.signed_headers[index + 1..]),
        })
    }

    /// Cut the canonical trimmed header around the `bh=` value. The value must be
    /// the plain base64 of the body hash, so the circuit can rebuild it.
    pub fn split_signature_header(&self) -> ParserResult<SignatureSplit> {
        let header = self.trimmed_header.as_bytes();
        let colon = find_subsequence(header, b":")
            .ok_or_else(|| ParserError::HeaderFormatError("no colon in DKIM-Signature".into()))?;

        let mut offset = colon + 1;
        for tag in header[colon + 1..].split(|c| *c == b';') {
            let end = offset + tag.len();
            if let Some(eq) = find_subsequence(tag, b"=") {
                let name = String::from_utf8_lossy(&tag[..eq]);
                if name.trim() == "bh" {
                    let value = &tag[eq + 1..];
                    let leading = value.iter().take_while(|c| c.is_ascii_whitespace()).count();
                    let trailing = value
                        .iter()
                        .rev()
                        .take_while(|c| c.is_ascii_whitespace())
                        .count();
                    let start = offset + eq + 1 + leading;
                    let stop = (end - trailing).max(start);

                    let expected = general_purpose::STANDARD.encode(&self.signature.body_hash);
                    // a folded value keeps a space after relaxed canonicalization
                    if &header[start..stop] != expected.as_bytes() {
                        return Err(ParserError::HeaderFormatError(
                            "bh= value must be contiguous base64 of the body hash, folded or \
                             non-canonical values are not supported"
                                .into(),
                        ));
                    }

                    return Ok(SignatureSplit {
                        sig_prefix: header[..start].to_vec(),
                        sig_suffix: header[stop..].to_vec(),
                    });
                }
            }
            offset = end + 1;
        }

        Err(ParserError::MissingTag("bh"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::fixup_newlines;

    pub const HEADERS_ONLY: &str = "mime-version:1.0
from:Jelle van den Hooff <jelle@vandenhooff.name>
date:Sun, 29 Mar 2015 22:39:03 -0400
message-id:<CAP=Jqubpoizbfg+Fb_+ycEkhqrgMBE=qozKrRubUuimQ717wKw@mail.gmail.com>
subject:vnsy7km1hn4crbyp0h32m3932p38qtgbhpxf9mp01s6w40mvk2jg
to:1v443yp1p8@keytree.io
content-type:text/plain; charset=UTF-8
dkim-signature:v=1; a=rsa-sha256; c=relaxed/relaxed; d=vandenhooff.name; s=google; h=mime-version:from:date:message-id:subject:to:content-type; bh=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=; b=NCOUEepJZ6cdKYtq61hifQ9K0fimliTNcDVDBQ8C1OQToNxNGQuGifUxWQ/6odRnmm+TGraJoXyKu2WwVl2auHW6Hug/9QBWg6JIQrUl3TLK5Z07IZHpqBFrXjqV/fd6Yl/1+LZSaJ9lwo6YW6LvwoAq4AUwPDZqXeak7i5pj2U=";

    #[test]
    fn test_headers_only() {
        let msg = parse_dkim_message(&fixup_newlines(HEADERS_ONLY), true).unwrap();
        assert_eq!(msg.signed_headers.len(), 7);
        assert_eq!(msg.signed_headers[1].canonical, "from:Jelle van den Hooff <jelle@vandenhooff.name>\r\n");
        assert!(msg.trimmed_header.ends_with("; b="));
        msg.verify_body_hash().unwrap();

        let data = msg.signed_data();
        assert!(data.starts_with(b"mime-version:1.0\r\nfrom:"));
        assert!(data.ends_with(b"; b="));
        assert_eq!(msg.header_hash().len(), 32);
    }

    #[test]
    fn test_split_at_header() {
        let msg = parse_dkim_message(&fixup_newlines(HEADERS_ONLY), true).unwrap();
        let split = msg.split_at_header("to").unwrap();
        assert_eq!(split.specify, b"to:1v443yp1p8@keytree.io\r\n".to_vec());
        assert!(split.prefix.starts_with(b"mime-version:1.0\r\n"));
        assert_eq!(split.suffix, b"content-type:text/plain; charset=UTF-8\r\n".to_vec());

        let mut joined = split.prefix.clone();
        joined.extend(&split.specify);
        joined.extend(&split.suffix);
        joined.extend(msg.trimmed_header.as_bytes());
        assert_eq!(joined, msg.signed_data());

        assert!(matches!(
            msg.split_at_header("reply-to"),
            Err(ParserError::MissingHeader(_))
        ));
    }

    #[test]
    fn test_split_signature_header() {
        let msg = parse_dkim_message(&fixup_newlines(HEADERS_ONLY), true).unwrap();
        let split = msg.split_signature_header().unwrap();
        assert!(split.sig_prefix.ends_with(b"content-type; bh="));
        assert_eq!(split.sig_suffix, b"; b=".to_vec());

        let mut joined = split.sig_prefix.clone();
        joined.extend(b"47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
        joined.extend(&split.sig_suffix);
        assert_eq!(joined, msg.trimmed_header.as_bytes());
    }

    #[test]
    fn test_body_hash_mismatch() {
        let raw = format!("{}\r\n\r\nhello\r\n", fixup_newlines(HEADERS_ONLY));
        let msg = parse_dkim_message(&raw, true).unwrap();
        assert!(matches!(
            msg.verify_body_hash(),
            Err(ParserError::BodyHashMismatch)
        ));
    }

    fn fields(raw: &str) -> Vec<HeaderField> {
        parse_email(raw).unwrap().headers
    }

    #[test]
    fn test_signature_header_count() {
        let headers = fields(
            "From: a@b.c\r\nDKIM-Signature: a=rsa-sha256\r\ndkim-signature: a=rsa-sha256\r\n",
        );
        assert!(matches!(
            find_signature_header(&headers),
            Err(ParserError::MultipleSignatureHeaders)
        ));
        assert!(matches!(
            find_signature_header(&headers[..1]),
            Err(ParserError::NoSignatureHeader)
        ));
        assert_eq!(find_signature_header(&headers[..2]).unwrap(), &headers[1]);
    }

    #[test]
    fn test_folded_body_hash() {
        let raw = fixup_newlines(HEADERS_ONLY).replace(
            "bh=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=",
            "bh=47DEQpj8HBSa+/TImW+5\r\n JCeuQeRkm5NMpJWZG3hSuFU=",
        );
        let msg = parse_dkim_message(&raw, true).unwrap();
        assert_eq!(msg.signature.body_hash.len(), 32);

        let err = msg.split_signature_header().unwrap_err();
        assert!(matches!(err, ParserError::HeaderFormatError(_)));
        assert!(err.to_string().contains("folded"), "{}", err);
    }

    #[test]
    fn test_extract_signed_headers() {
        let headers = fields("Received: one\r\nFrom: a@b.c\r\nReceived: two\r\n");
        let names: Vec<String> = vec!["received".into(), "from".into(), "received".into(), "received".into()];
        let selected = extract_signed_headers(&headers, &names, false).unwrap();
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].1, &headers[2]);
        assert_eq!(selected[1].1, &headers[1]);
        assert_eq!(selected[2].1, &headers[0]);

        assert!(matches!(
            extract_signed_headers(&headers, &names, true),
            Err(ParserError::MissingHeader(name)) if name == "received"
        ));
    }
}
