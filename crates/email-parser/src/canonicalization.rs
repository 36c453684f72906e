use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{email::HeaderField, error::ParserError, ParserResult};

/// DKIM canonicalization algorithm (RFC 6376 §3.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Canon {
    Simple,
    Relaxed,
}

impl FromStr for Canon {
    type Err = ParserError;

    fn from_str(s: &str) -> ParserResult<Self> {
        match s {
            "simple" => Ok(Canon::Simple),
            "relaxed" => Ok(Canon::Relaxed),
            other => Err(ParserError::UnknownCanonicalization(other.to_string())),
        }
    }
}

fn is_wsp(c: char) -> bool {
    c == ' ' || c == '\t'
}

// runs of WSP become a single SP
fn collapse_wsp(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_wsp = false;
    for c in s.chars() {
        if is_wsp(c) {
            if !in_wsp {
                out.push(' ');
            }
            in_wsp = true;
        } else {
            out.push(c);
            in_wsp = false;
        }
    }
    out
}

/// canonical form of one header field, ending with CRLF for `relaxed`
pub fn canonicalize_header(canon: Canon, field: &HeaderField) -> String {
    match canon {
        Canon::Simple => field.raw.clone(),
        Canon::Relaxed => {
            let value: String = field
                .value
                .chars()
                .filter(|c| *c != '\r' && *c != '\n')
                .collect();
            let value = collapse_wsp(&value);

            format!(
                "{}:{}\r\n",
                field.name.trim_end_matches(is_wsp).to_lowercase(),
                value.trim_matches(is_wsp)
            )
        }
    }
}

/// canonical form of the body
pub fn canonicalize_body(canon: Canon, body: &str) -> String {
    match canon {
        Canon::Simple => {
            let trimmed = body.trim_end_matches("\r\n");
            if trimmed.is_empty() {
                "\r\n".to_string()
            } else {
                format!("{}\r\n", trimmed)
            }
        }
        Canon::Relaxed => {
            let lines: Vec<String> = body
                .split("\r\n")
                .map(|line| collapse_wsp(line).trim_end_matches(is_wsp).to_string())
                .collect();
            let mut end = lines.len();
            while end > 0 && lines[end - 1].is_empty() {
                end -= 1;
            }

            lines[..end]
                .iter()
                .map(|line| format!("{}\r\n", line))
                .collect()
        }
    }
}
