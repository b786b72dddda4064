//! Command argument model and wire rendering.
//!
//! A command is rendered into a sequence of wire chunks: each chunk is a
//! run of line text, optionally followed by one literal payload. The engine
//! writes chunks in order, flushing and waiting for a continuation before
//! each synchronizing literal payload.

use super::literal::{self, LiteralOptions};
use crate::Result;
use crate::types::CapabilitySet;

/// One argument of an outgoing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Raw atom, written as-is (caller guarantees atom-safety).
    Atom(String),
    /// Atom-or-quoted string: quoted and escaped only when needed.
    AString(String),
    /// Length-prefixed raw payload with requested framing options.
    Literal {
        /// Payload bytes.
        data: Vec<u8>,
        /// Requested framing.
        options: LiteralOptions,
    },
    /// Parenthesized argument list.
    Group(Vec<Argument>),
}

impl Argument {
    /// Convenience constructor for a synchronizing literal.
    #[must_use]
    pub fn literal(data: impl Into<Vec<u8>>) -> Self {
        Self::Literal {
            data: data.into(),
            options: LiteralOptions::synchronizing(),
        }
    }

    /// Convenience constructor for a literal with explicit options.
    #[must_use]
    pub fn literal_with(data: impl Into<Vec<u8>>, options: LiteralOptions) -> Self {
        Self::Literal {
            data: data.into(),
            options,
        }
    }
}

/// A literal payload scheduled after a line chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LiteralPayload {
    pub data: Vec<u8>,
    /// Synchronizing form: flush and block for `+` before sending.
    pub wait_for_continuation: bool,
}

/// Line text plus an optional trailing literal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WireChunk {
    pub line: Vec<u8>,
    pub literal: Option<LiteralPayload>,
}

/// Renders `TAG NAME args...` into ordered wire chunks, resolving each
/// literal's framing against the capability snapshot.
///
/// Incapability is detected here, before any I/O.
pub(crate) fn render_command(
    tag: &str,
    name: &str,
    args: &[Argument],
    capabilities: &CapabilitySet,
    strict: bool,
) -> Result<Vec<WireChunk>> {
    let mut chunks = Vec::new();
    let mut line = format!("{tag} {name}").into_bytes();

    for arg in args {
        line.push(b' ');
        render_argument(arg, &mut line, &mut chunks, capabilities, strict)?;
    }

    line.extend_from_slice(b"\r\n");
    chunks.push(WireChunk {
        line,
        literal: None,
    });
    Ok(chunks)
}

fn render_argument(
    arg: &Argument,
    line: &mut Vec<u8>,
    chunks: &mut Vec<WireChunk>,
    capabilities: &CapabilitySet,
    strict: bool,
) -> Result<()> {
    match arg {
        Argument::Atom(s) => line.extend_from_slice(s.as_bytes()),
        Argument::AString(s) => write_astring(line, s),
        Argument::Literal { data, options } => {
            let form = literal::resolve(*options, capabilities, strict)?;
            line.extend_from_slice(form.header(data.len() as u64).as_bytes());
            line.extend_from_slice(b"\r\n");
            chunks.push(WireChunk {
                line: std::mem::take(line),
                literal: Some(LiteralPayload {
                    data: data.clone(),
                    wait_for_continuation: !form.non_sync,
                }),
            });
        }
        Argument::Group(items) => {
            line.push(b'(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    line.push(b' ');
                }
                render_argument(item, line, chunks, capabilities, strict)?;
            }
            line.push(b')');
        }
    }
    Ok(())
}

/// Writes an astring (atom or quoted string).
pub(crate) fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}
