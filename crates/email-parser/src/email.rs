use mailparse::{parse_header, MailHeader};

use crate::ParserResult;

/// One header field of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// field name, surrounding whitespace removed
    pub name: String,
    /// the value after the colon, folding kept
    pub value: String,
    /// the field as it appears in the message, trailing CRLF included
    pub raw: String,
}

impl HeaderField {
    fn new(header: &MailHeader<'_>, raw: &[u8]) -> Self {
        Self {
            name: header.get_key().trim().to_string(),
            value: String::from_utf8_lossy(header.get_value_raw()).into_owned(),
            raw: String::from_utf8_lossy(raw).into_owned(),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A message split into its header fields and its body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Email {
    pub headers: Vec<HeaderField>,
    pub body: String,
}

/// every LF not preceded by CR becomes CRLF
pub fn fixup_newlines(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 32);
    let mut prev = '\0';
    for c in raw.chars() {
        if c == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(c);
        prev = c;
    }
    out
}

/// Split a message at the first empty line. Header fields are read with
/// `mailparse`, keeping the raw bytes of each. No MIME processing.
pub fn parse_email(mail: &str) -> ParserResult<Email> {
    let data = mail.as_bytes();
    let mut headers = Vec::new();
    let mut ix = 0;

    while ix < data.len() {
        if data[ix..].starts_with(b"\r\n") {
            ix += 2;
            break;
        }
        if data[ix] == b'\n' {
            ix += 1;
            break;
        }

        let (header, consumed) = parse_header(&data[ix..])?;
        if consumed == 0 {
            break;
        }
        headers.push(HeaderField::new(&header, &data[ix..ix + consumed]));
        ix += consumed;
    }
    log::debug!(
        "parsed {} header fields, body of {} bytes",
        headers.len(),
        data.len() - ix
    );

    Ok(Email {
        headers,
        body: String::from_utf8_lossy(&data[ix..]).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email() {
        let raw = "From: a@b.c\r\nSubject: hello\r\n world\r\nTo: d@e.f\r\n\r\nbody line\r\n";
        let email = parse_email(raw).unwrap();
        let raws: Vec<&str> = email.headers.iter().map(|h| h.raw.as_str()).collect();
        assert_eq!(
            raws,
            vec!["From: a@b.c\r\n", "Subject: hello\r\n world\r\n", "To: d@e.f\r\n"]
        );
        assert_eq!(email.body, "body line\r\n");

        assert!(email.headers[1].is_named("subject"));
        assert_eq!(email.headers[1].name, "Subject");
        assert_eq!(email.headers[1].value, "hello\r\n world");
    }

    #[test]
    fn test_headers_only() {
        let email = parse_email("a:1\r\nb:2").unwrap();
        assert_eq!(email.headers.len(), 2);
        assert_eq!(email.headers[0].raw, "a:1\r\n");
        assert_eq!(email.headers[1].raw, "b:2");
        assert_eq!(email.body, "");
    }

    #[test]
    fn test_fixup_newlines() {
        assert_eq!(fixup_newlines("a:1\nb:2\n"), "a:1\r\nb:2\r\n");
        assert_eq!(fixup_newlines("a:1\r\nb:2\r\n"), "a:1\r\nb:2\r\n");
    }

    #[test]
    fn test_mixed_newlines() {
        let raw = fixup_newlines("From: a@b.c\r\nTo: d@e.f\nSubject: hi\n\nbody\n");
        assert_eq!(raw, "From: a@b.c\r\nTo: d@e.f\r\nSubject: hi\r\n\r\nbody\r\n");

        let email = parse_email(&raw).unwrap();
        assert_eq!(email.headers.len(), 3);
        assert_eq!(email.headers[2].raw, "Subject: hi\r\n");
        assert_eq!(email.body, "body\r\n");
    }
}
