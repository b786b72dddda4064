//! Idle long-poll: the sanctioned way to hold the transaction slot open.
//!
//! While idling the session itself is the receive loop; there is no
//! background reader. Unsolicited responses are applied to mailbox state as
//! they arrive, and a BYE at any point during the wait is a valid terminal,
//! not a protocol fault.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::debug;

use super::{CommandResult, Session, SessionState};
use crate::parser::{Response, UntaggedResponse};
use crate::types::{Capability, Status};
use crate::{Error, Result};

/// Witness of an open idle wait, consumed by [`Session::end_idle`].
#[derive(Debug)]
pub struct IdleHandle {
    tag: String,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens an idle wait: issues IDLE and blocks for the continuation.
    ///
    /// The server must advertise IDLE; this gate is strict regardless of
    /// the incapability policy, since there is no result to fail through.
    /// A tagged NO instead of the continuation raises [`Error::No`].
    pub async fn begin_idle(&mut self) -> Result<IdleHandle> {
        self.ensure_state(
            "IDLE",
            &[SessionState::Authenticated, SessionState::Selected],
        )?;
        if self.idling {
            return Err(Error::Protocol("an idle wait is already open".to_string()));
        }
        self.ensure_no_transaction("IDLE")?;
        if !self.capabilities().has(&Capability::Idle) {
            return Err(Error::Incapable(Capability::Idle));
        }

        let tag = self.next_tag();
        self.transaction_proceeding = true;

        let opened = self.open_idle(&tag).await;
        match opened {
            Ok(()) => {
                self.idling = true;
                debug!(tag = %tag, "idle wait open");
                Ok(IdleHandle { tag })
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

    async fn open_idle(&mut self, tag: &str) -> Result<()> {
        self.write_bytes(format!("{tag} IDLE\r\n").as_bytes(), None)
            .await?;
        self.flush_stream(None).await?;

        let mut seen = Vec::new();
        match self.await_continuation(tag, &mut seen, None).await? {
            None => Ok(()),
            Some(tagged) => match tagged.status {
                Status::No => Err(Error::No(tagged.text)),
                Status::Bad => Err(Error::Bad(tagged.text)),
                Status::Bye => Err(Error::Bye(tagged.text)),
                Status::Ok | Status::PreAuth => Err(Error::Protocol(
                    "IDLE terminated without a continuation".to_string(),
                )),
            },
        }
    }

    /// Ends an open idle wait: sends DONE and drains to the terminal.
    ///
    /// A BYE during the drain is a valid terminal; the result carries it
    /// and the connection is torn down without an error.
    pub async fn end_idle(&mut self, handle: IdleHandle) -> Result<CommandResult> {
        if !self.idling {
            return Err(Error::InvalidState("no idle wait is open".to_string()));
        }
        self.close_idle(&handle.tag, Vec::new()).await
    }

    async fn close_idle(
        &mut self,
        tag: &str,
        responses: Vec<UntaggedResponse>,
    ) -> Result<CommandResult> {
        let outcome = self.drain_idle(tag, responses).await;
        self.idling = false;
        self.transaction_proceeding = false;

        match outcome {
            Ok(result) => {
                if result.status == Status::Bye {
                    self.teardown();
                }
                Ok(result)
            }
            Err(e) => {
                if e.is_fatal() {
                    self.teardown();
                }
                Err(e)
            }
        }
    }

    async fn drain_idle(
        &mut self,
        tag: &str,
        mut responses: Vec<UntaggedResponse>,
    ) -> Result<CommandResult> {
        let deadline = self.transaction_deadline();
        self.write_bytes(b"DONE\r\n", deadline).await?;
        self.flush_stream(deadline).await?;

        loop {
            match self.read_response(deadline).await? {
                Response::Untagged(UntaggedResponse::Status {
                    status: Status::Bye,
                    code,
                    text,
                }) => {
                    return Ok(CommandResult {
                        tag: tag.to_string(),
                        status: Status::Bye,
                        code,
                        text,
                        responses,
                    });
                }
                Response::Untagged(untagged) => {
                    self.dispatch_untagged(&untagged);
                    responses.push(untagged);
                }
                Response::Continuation { .. } => {
                    return Err(Error::Protocol(
                        "unexpected continuation while ending IDLE".to_string(),
                    ));
                }
                Response::Tagged(tagged) if tagged.tag == tag => {
                    return self.finish(tagged, responses);
                }
                Response::Tagged(tagged) => {
                    return Err(Error::Protocol(format!(
                        "tag mismatch: expected {tag}, received {}",
                        tagged.tag
                    )));
                }
            }
        }
    }

    /// Idles for up to `duration`, applying unsolicited responses to
    /// mailbox state as they arrive.
    ///
    /// Returns whether the wait terminated cleanly: `false` means the
    /// server closed the session with BYE.
    pub async fn idle(&mut self, duration: std::time::Duration) -> Result<bool> {
        self.idle_with(duration, &mut (), |_, _| Ok(true)).await
    }

    /// Idles for up to `duration`, handing each unsolicited response to
    /// `callback` after it has been applied to mailbox state.
    ///
    /// The callback returns `Ok(true)` to keep waiting, `Ok(false)` to end
    /// the wait early; an error ends the wait and tears the session down.
    /// Returns whether the wait terminated cleanly (`false` on BYE).
    pub async fn idle_with<T, F>(
        &mut self,
        duration: std::time::Duration,
        context: &mut T,
        mut callback: F,
    ) -> Result<bool>
    where
        F: FnMut(&mut T, &UntaggedResponse) -> Result<bool>,
    {
        let handle = self.begin_idle().await?;
        let deadline = Instant::now() + duration;
        let mut responses = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            // read_line keeps partial progress in the stream, so losing the
            // race against the timer cannot corrupt framing.
            let response =
                match tokio::time::timeout(remaining, self.read_response_unbounded()).await {
                    Err(_) => break,
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        self.idling = false;
                        self.transaction_proceeding = false;
                        if e.is_fatal() {
                            self.teardown();
                        }
                        return Err(e);
                    }
                };

            match response {
                Response::Untagged(UntaggedResponse::Status {
                    status: Status::Bye,
                    text,
                    ..
                }) => {
                    debug!(text = %text, "server ended session during idle");
                    self.teardown();
                    return Ok(false);
                }
                Response::Untagged(untagged) => {
                    self.dispatch_untagged(&untagged);
                    let keep_going = match callback(context, &untagged) {
                        Ok(keep_going) => keep_going,
                        Err(e) => {
                            self.teardown();
                            return Err(e);
                        }
                    };
                    responses.push(untagged);
                    if !keep_going {
                        break;
                    }
                }
                Response::Continuation { .. } => {
                    self.teardown();
                    return Err(Error::Protocol(
                        "unexpected continuation during idle".to_string(),
                    ));
                }
                Response::Tagged(tagged) if tagged.tag == handle.tag => {
                    // Server ended the wait on its own.
                    self.idling = false;
                    self.transaction_proceeding = false;
                    let result = self.finish(tagged, responses)?;
                    return Ok(result.is_ok());
                }
                Response::Tagged(tagged) => {
                    let mismatched = tagged.tag;
                    self.teardown();
                    return Err(Error::Protocol(format!(
                        "tag mismatch: expected {}, received {mismatched}",
                        handle.tag
                    )));
                }
            }
        }

        let result = self.close_idle(&handle.tag, responses).await?;
        Ok(result.status != Status::Bye && result.is_ok())
    }
}
