//! CRLF-framed buffered I/O.
//!
//! Reads logical response lines (absorbing server-side `{n}` literal
//! continuations into the line) and buffers writes so the engine can flush
//! at exactly the points the protocol requires - before each synchronizing
//! literal continuation wait and at end of command.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::Result;

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum server literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Framed stream over a duplex transport.
///
/// `read_line` is cancel-safe: all read progress lives in the stream state,
/// so the engine can race a read against a timer (the idle wait does) and
/// resume without losing framing.
#[derive(Debug)]
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    /// Logical line under construction.
    line: Vec<u8>,
    /// Index into `line` where the current physical line starts.
    physical_start: usize,
    /// Bytes of an announced server literal still to absorb.
    literal_remaining: usize,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            line: Vec::new(),
            physical_start: 0,
            literal_remaining: 0,
        }
    }

    /// Reads one logical response line.
    ///
    /// A physical line ending in `{n}` announces `n` literal bytes followed
    /// by more line text; those are absorbed so the caller always sees one
    /// complete response line ending in CRLF.
    pub async fn read_line(&mut self) -> Result<Vec<u8>> {
        loop {
            if self.literal_remaining > 0 {
                self.absorb_literal().await?;
                continue;
            }

            if self.complete_physical_line().await? {
                if let Some(literal_len) = parse_literal_length(&self.line[self.physical_start..]) {
                    if literal_len > MAX_LITERAL_SIZE {
                        self.line.clear();
                        self.physical_start = 0;
                        return Err(crate::Error::Protocol(format!(
                            "server literal too large: {literal_len} bytes"
                        )));
                    }
                    self.literal_remaining = literal_len;
                    continue;
                }
                self.physical_start = 0;
                return Ok(std::mem::take(&mut self.line));
            }
        }
    }

    /// Absorbs pending literal bytes into the line.
    async fn absorb_literal(&mut self) -> Result<()> {
        let buf = self.reader.fill_buf().await?;
        if buf.is_empty() {
            return Err(unexpected_eof());
        }
        let take = buf.len().min(self.literal_remaining);
        self.line.extend_from_slice(&buf[..take]);
        self.reader.consume(take);
        self.literal_remaining -= take;
        if self.literal_remaining == 0 {
            self.physical_start = self.line.len();
        }
        Ok(())
    }

    /// Advances the current physical line; returns true once it ends in CRLF.
    async fn complete_physical_line(&mut self) -> Result<bool> {
        let buf = self.reader.fill_buf().await?;
        if buf.is_empty() {
            return Err(unexpected_eof());
        }

        // CRLF may span two fills.
        if self.line.len() > self.physical_start
            && self.line.last() == Some(&b'\r')
            && buf[0] == b'\n'
        {
            self.line.push(b'\n');
            self.reader.consume(1);
            return Ok(true);
        }

        if let Some(pos) = buf.windows(2).position(|w| w == b"\r\n") {
            self.line.extend_from_slice(&buf[..pos + 2]);
            self.reader.consume(pos + 2);
            return Ok(true);
        }

        let len = buf.len();
        self.line.extend_from_slice(buf);
        self.reader.consume(len);

        if self.line.len() > MAX_LINE_LENGTH {
            self.line.clear();
            self.physical_start = 0;
            return Err(crate::Error::Protocol("line too long".to_string()));
        }
        Ok(false)
    }

    /// Buffers outgoing bytes without flushing.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.extend_from_slice(data);
        // Keep the buffer bounded for large literal payloads.
        if self.write_buffer.len() >= DEFAULT_BUFFER_SIZE {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flushes all buffered bytes to the transport.
    pub async fn flush(&mut self) -> Result<()> {
        if !self.write_buffer.is_empty() {
            let stream = self.reader.get_mut();
            stream.write_all(&self.write_buffer).await?;
            self.write_buffer.clear();
        }
        self.reader.get_mut().flush().await?;
        Ok(())
    }

    /// Consumes the framed stream and returns the inner transport.
    ///
    /// Buffered data is dropped.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

fn unexpected_eof() -> crate::Error {
    crate::Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed",
    ))
}

/// Parses a trailing server literal announcement: `... {123}\r\n`.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}
