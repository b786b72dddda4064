//! Streamed APPEND: the second sanctioned long-lived transaction.
//!
//! `begin_append` opens the transaction and holds the slot; the message
//! body is then fed in with `append_write`. With a declared length the
//! command line goes out immediately and bytes past the declaration are
//! discarded; without one the body is buffered and the command line is
//! emitted with the true length when the body closes.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::{CommandResult, Session, SessionState};
use crate::command::{LiteralOptions, resolve, write_astring};
use crate::types::Flag;
use crate::{Error, Result};

/// State of an append whose body is still streaming or whose terminal has
/// not been retrieved yet.
#[derive(Debug)]
pub(crate) struct PendingAppend {
    tag: String,
    /// Declared body length; `None` buffers until close.
    declared: Option<u64>,
    written: u64,
    buffer: Vec<u8>,
    options: LiteralOptions,
    /// Pre-rendered command line up to the literal header (unknown length).
    prefix: Option<Vec<u8>>,
    /// Terminal already received (premature NO, or known-length close).
    terminal: Option<CommandResult>,
    /// Cleared by a premature NO: later writes are discarded.
    writable: bool,
    body_complete: bool,
}

impl PendingAppend {
    /// Whether the transaction already completed and only the stored
    /// terminal remains to be fetched. A settled append no longer holds
    /// the transaction slot.
    pub(super) fn is_settled(&self) -> bool {
        self.body_complete && self.terminal.is_some()
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Appends a complete message in one transaction.
    pub async fn append(
        &mut self,
        mailbox: &str,
        flags: &[Flag],
        message: impl Into<Vec<u8>>,
        options: LiteralOptions,
    ) -> Result<CommandResult> {
        self.ensure_state(
            "APPEND",
            &[SessionState::Authenticated, SessionState::Selected],
        )?;
        let mut args = vec![crate::command::Argument::AString(mailbox.to_string())];
        if !flags.is_empty() {
            args.push(crate::command::Argument::Atom(flag_list(flags)));
        }
        args.push(crate::command::Argument::literal_with(message, options));
        self.run_transaction("APPEND", &args).await
    }

    /// Opens a streamed append.
    ///
    /// With `length` the command line is sent now and the body must supply
    /// exactly that many bytes; surplus bytes are discarded. Without it the
    /// body is buffered and framed when [`finish_append`] closes it.
    ///
    /// A tagged NO arriving instead of the continuation leaves the failed
    /// result retrievable through [`append_result`]; further body writes
    /// are discarded.
    ///
    /// [`finish_append`]: Self::finish_append
    /// [`append_result`]: Self::append_result
    pub async fn begin_append(
        &mut self,
        mailbox: &str,
        flags: &[Flag],
        length: Option<u64>,
        options: LiteralOptions,
    ) -> Result<()> {
        self.ensure_state(
            "APPEND",
            &[SessionState::Authenticated, SessionState::Selected],
        )?;
        self.ensure_no_transaction("APPEND")?;
        let form = resolve(options, self.capabilities(), self.incapable_as_error)?;

        let tag = self.next_tag();
        let mut prefix = format!("{tag} APPEND ").into_bytes();
        write_astring(&mut prefix, mailbox);
        if !flags.is_empty() {
            prefix.push(b' ');
            prefix.extend_from_slice(flag_list(flags).as_bytes());
        }
        prefix.push(b' ');

        self.transaction_proceeding = true;
        let mut pending = PendingAppend {
            tag,
            declared: length,
            written: 0,
            buffer: Vec::new(),
            options,
            prefix: None,
            terminal: None,
            writable: true,
            body_complete: false,
        };

        let Some(length) = length else {
            pending.prefix = Some(prefix);
            self.pending_append = Some(pending);
            return Ok(());
        };

        let mut line = prefix;
        line.extend_from_slice(form.header(length).as_bytes());
        line.extend_from_slice(b"\r\n");

        let opened = self.open_append_body(&mut pending, &line, !form.non_sync).await;
        match opened {
            Ok(()) => {
                debug!(tag = %pending.tag, length, "append body open");
                self.pending_append = Some(pending);
                Ok(())
            }
            Err(e) => {
                self.transaction_proceeding = false;
                if e.is_fatal() {
                    self.teardown();
                }
                Err(e)
            }
        }
    }

    /// Sends the command line and, for the synchronizing form, waits for
    /// the continuation. A premature terminal is folded into `pending`.
    async fn open_append_body(
        &mut self,
        pending: &mut PendingAppend,
        line: &[u8],
        wait: bool,
    ) -> Result<()> {
        let deadline = self.transaction_deadline();
        self.write_bytes(line, deadline).await?;
        self.flush_stream(deadline).await?;

        if wait {
            let mut responses = Vec::new();
            let tag = pending.tag.clone();
            if let Some(tagged) = self.await_continuation(&tag, &mut responses, deadline).await? {
                let result = self.finish(tagged, responses)?;
                debug!(tag = %pending.tag, text = %result.text, "append refused before body");
                pending.terminal = Some(result);
                pending.writable = false;
                self.transaction_proceeding = false;
            }
        }
        Ok(())
    }

    /// Feeds body bytes into the open append.
    ///
    /// After a premature NO the bytes are discarded; with a declared
    /// length, bytes past the declaration are discarded as well.
    pub async fn append_write(&mut self, data: &[u8]) -> Result<()> {
        let mut pending = self
            .pending_append
            .take()
            .ok_or_else(|| Error::InvalidState("no append is pending".to_string()))?;

        if pending.body_complete {
            self.pending_append = Some(pending);
            return Err(Error::InvalidState(
                "append body is already closed".to_string(),
            ));
        }

        let outcome = self.write_append_body(&mut pending, data).await;
        match outcome {
            Ok(()) => {
                self.pending_append = Some(pending);
                Ok(())
            }
            Err(e) => {
                self.transaction_proceeding = false;
                if e.is_fatal() {
                    self.teardown();
                }
                Err(e)
            }
        }
    }

    async fn write_append_body(&mut self, pending: &mut PendingAppend, data: &[u8]) -> Result<()> {
        if !pending.writable {
            return Ok(());
        }
        match pending.declared {
            Some(declared) => {
                let room = declared.saturating_sub(pending.written);
                let take = usize::try_from(room.min(data.len() as u64)).unwrap_or(data.len());
                if take > 0 {
                    self.write_bytes(&data[..take], None).await?;
                    pending.written += take as u64;
                }
            }
            None => pending.buffer.extend_from_slice(data),
        }
        Ok(())
    }

    /// Closes the append body.
    ///
    /// With a declared length the body must be complete: closing short is
    /// a framing fault and tears the connection down. The terminal is
    /// collected immediately and the session is free for other commands;
    /// fetching the stored result through
    /// [`append_result`](Self::append_result) is optional. Without a
    /// declared length the buffered body is framed and sent; the terminal
    /// is collected by `append_result`.
    pub async fn finish_append(&mut self) -> Result<()> {
        let mut pending = self
            .pending_append
            .take()
            .ok_or_else(|| Error::InvalidState("no append is pending".to_string()))?;

        // A premature refusal already terminated the transaction; closing
        // the dead body is a no-op.
        if pending.terminal.is_some() {
            pending.body_complete = true;
            self.pending_append = Some(pending);
            return Ok(());
        }

        if pending.body_complete {
            self.pending_append = Some(pending);
            return Err(Error::InvalidState(
                "append body is already closed".to_string(),
            ));
        }

        let outcome = self.close_append_body(&mut pending).await;
        match outcome {
            Ok(()) => {
                pending.body_complete = true;
                self.pending_append = Some(pending);
                Ok(())
            }
            Err(e) => {
                self.transaction_proceeding = false;
                if e.is_fatal() {
                    self.teardown();
                }
                Err(e)
            }
        }
    }

    async fn close_append_body(&mut self, pending: &mut PendingAppend) -> Result<()> {
        let deadline = self.transaction_deadline();

        match pending.declared {
            Some(declared) => {
                if pending.written < declared {
                    return Err(Error::Protocol(format!(
                        "append body closed short: {} of {declared} bytes",
                        pending.written
                    )));
                }
                self.write_bytes(b"\r\n", deadline).await?;
                self.flush_stream(deadline).await?;

                // Known-length appends complete on close.
                let mut responses = Vec::new();
                let tagged = self
                    .receive_terminal(&pending.tag, &mut responses, deadline)
                    .await?;
                pending.terminal = Some(self.finish(tagged, responses)?);
                self.transaction_proceeding = false;
                Ok(())
            }
            None => {
                let form = resolve(pending.options, self.capabilities(), self.incapable_as_error)?;
                let mut line = pending.prefix.take().unwrap_or_default();
                line.extend_from_slice(form.header(pending.buffer.len() as u64).as_bytes());
                line.extend_from_slice(b"\r\n");

                self.write_bytes(&line, deadline).await?;
                self.flush_stream(deadline).await?;

                if !form.non_sync {
                    let mut responses = Vec::new();
                    let tag = pending.tag.clone();
                    if let Some(tagged) =
                        self.await_continuation(&tag, &mut responses, deadline).await?
                    {
                        pending.terminal = Some(self.finish(tagged, responses)?);
                        pending.writable = false;
                        self.transaction_proceeding = false;
                        return Ok(());
                    }
                }

                let body = std::mem::take(&mut pending.buffer);
                self.write_bytes(&body, deadline).await?;
                self.write_bytes(b"\r\n", deadline).await?;
                self.flush_stream(deadline).await?;
                Ok(())
            }
        }
    }

    /// Retrieves the terminal of the pending append, waiting for it if it
    /// has not arrived yet. The pending slot is released.
    pub async fn append_result(&mut self) -> Result<CommandResult> {
        let mut pending = self
            .pending_append
            .take()
            .ok_or_else(|| Error::InvalidState("no append is pending".to_string()))?;

        if !pending.body_complete {
            self.pending_append = Some(pending);
            return Err(Error::InvalidState("append body is still open".to_string()));
        }

        if let Some(result) = pending.terminal.take() {
            return Ok(result);
        }

        let deadline = self.transaction_deadline();
        let mut responses = Vec::new();
        let outcome = self
            .receive_terminal(&pending.tag, &mut responses, deadline)
            .await
            .and_then(|tagged| self.finish(tagged, responses));
        self.transaction_proceeding = false;

        match outcome {
            Ok(result) => Ok(result),
            Err(e) => {
                if e.is_fatal() {
                    self.teardown();
                }
                Err(e)
            }
        }
    }
}

fn flag_list(flags: &[Flag]) -> String {
    let inner = flags
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!("({inner})")
}
