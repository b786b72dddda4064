//! Single-line response parser.
//!
//! Decodes one protocol line into a typed [`Response`]: untagged data, a
//! continuation request, or a tagged status. The engine only needs the
//! response classes and the handful of untagged forms that drive session
//! and mailbox state; everything else surfaces as
//! [`UntaggedResponse::Other`] for command-specific collaborators to decode.

use crate::types::{CapabilitySet, Flag, ResponseCode, Status};
use crate::{Error, Result};

/// One parsed server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Server-pushed data not tied to a specific tag.
    Untagged(UntaggedResponse),
    /// Continuation request: the server wants more client data.
    Continuation {
        /// Free text (or base64 challenge) after the `+`.
        text: String,
    },
    /// Terminal status for the transaction whose tag is echoed.
    Tagged(TaggedResponse),
}

/// A tagged status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedResponse {
    /// Echoed client tag.
    pub tag: String,
    /// Terminal status.
    pub status: Status,
    /// Optional bracketed response code.
    pub code: Option<ResponseCode>,
    /// Human-readable text.
    pub text: String,
}

/// An untagged (`*`-prefixed) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// Untagged OK/NO/BAD/BYE/PREAUTH status, e.g. the greeting.
    Status {
        /// Status word.
        status: Status,
        /// Optional bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...` listing.
    Capability(CapabilitySet),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(u32),
    /// `* FLAGS (...)`
    Flags(Vec<Flag>),
    /// Any other untagged data (FETCH, LIST, SEARCH, ...), left raw for
    /// command-specific decoders.
    Other {
        /// Upper-cased response name.
        name: String,
        /// Full line content after `* `, undecoded.
        line: String,
    },
}

/// Parses single protocol lines.
#[derive(Debug)]
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one CRLF-terminated line (the CRLF may be present or already
    /// stripped).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for lines that do not match any response
    /// class; the engine treats that as a fatal framing fault.
    pub fn parse_line(line: &[u8]) -> Result<Response> {
        let text = String::from_utf8_lossy(strip_crlf(line));

        if let Some(rest) = text.strip_prefix('+') {
            return Ok(Response::Continuation {
                text: rest.trim_start().to_string(),
            });
        }

        if let Some(rest) = text.strip_prefix("* ") {
            return parse_untagged(rest);
        }

        parse_tagged(&text)
    }
}

fn strip_crlf(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r\n").unwrap_or(line)
}

fn parse_untagged(rest: &str) -> Result<Response> {
    let (first, tail) = split_token(rest);

    // Numeric-prefixed data: "n EXISTS", "n RECENT", "n EXPUNGE", "n FETCH ..."
    if let Ok(number) = first.parse::<u32>() {
        let (name, data) = split_token(tail);
        let upper = name.to_ascii_uppercase();
        let untagged = match upper.as_str() {
            "EXISTS" => UntaggedResponse::Exists(number),
            "RECENT" => UntaggedResponse::Recent(number),
            "EXPUNGE" => UntaggedResponse::Expunge(number),
            "" => return Err(Error::Protocol(format!("truncated untagged response: {rest}"))),
            _ => UntaggedResponse::Other {
                name: upper,
                line: format!("{number} {name} {data}").trim_end().to_string(),
            },
        };
        return Ok(Response::Untagged(untagged));
    }

    let upper = first.to_ascii_uppercase();
    if let Some(status) = Status::parse(&upper) {
        let (code, text) = parse_status_tail(tail);
        return Ok(Response::Untagged(UntaggedResponse::Status {
            status,
            code,
            text,
        }));
    }

    let untagged = match upper.as_str() {
        "CAPABILITY" => UntaggedResponse::Capability(CapabilitySet::parse(tail)),
        "FLAGS" => UntaggedResponse::Flags(Flag::parse_list(tail)),
        "" => return Err(Error::Protocol("empty untagged response".to_string())),
        _ => UntaggedResponse::Other {
            name: upper,
            line: rest.to_string(),
        },
    };
    Ok(Response::Untagged(untagged))
}

fn parse_tagged(line: &str) -> Result<Response> {
    let (tag, tail) = split_token(line);
    if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::Protocol(format!("unparsable response line: {line}")));
    }

    let (word, tail) = split_token(tail);
    let status = Status::parse(word)
        .ok_or_else(|| Error::Protocol(format!("unknown status {word:?} for tag {tag}")))?;

    let (code, text) = parse_status_tail(tail);
    Ok(Response::Tagged(TaggedResponse {
        tag: tag.to_string(),
        status,
        code,
        text,
    }))
}

/// Splits an optional leading `[code]` off the response text.
fn parse_status_tail(tail: &str) -> (Option<ResponseCode>, String) {
    let tail = tail.trim_start();
    if let Some(rest) = tail.strip_prefix('[')
        && let Some(end) = rest.find(']')
    {
        let code = ResponseCode::parse(&rest[..end]);
        let text = rest[end + 1..].trim_start().to_string();
        return (Some(code), text);
    }
    (None, tail.to_string())
}

fn split_token(s: &str) -> (&str, &str) {
    match s.split_once(' ') {
        Some((token, rest)) => (token, rest),
        None => (s, ""),
    }
}
