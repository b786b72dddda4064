//! Session engine: one connection, one transaction at a time.
//!
//! All protocol I/O flows through [`Session`]. A transaction issues the next
//! tag, writes the command (pausing before each synchronizing literal), then
//! reads responses until the matching tagged terminal arrives. Untagged
//! responses observed along the way are applied to session and mailbox state
//! in wire arrival order and buffered onto the eventual [`CommandResult`].
//!
//! Exactly one transaction may proceed at a time. The two long-lived
//! exceptions, an open idle wait and a pending append body, hold the
//! transaction slot until they complete.

#![allow(clippy::missing_errors_doc)]

mod append;
mod auth;
mod idle;
mod state;

pub use auth::{AuthMechanism, Credential, LoginMechanism, PlainMechanism};
pub use idle::IdleHandle;
pub use state::SessionState;

use append::PendingAppend;

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::command::{Argument, TagSequence, WireChunk, render_command};
use crate::connection::{Config, FramedStream, Security, Transport};
use crate::parser::{Response, ResponseParser, TaggedResponse, UntaggedResponse};
use crate::types::{Authority, Capability, CapabilitySet, ResponseCode, SelectedMailbox, Status};
use crate::{Error, Result};

/// Terminal outcome of one transaction.
///
/// A NO terminal is a *failed result*, not an error: check [`is_ok`] before
/// trusting the outcome. Untagged responses received during the transaction
/// are buffered here in wire arrival order.
///
/// [`is_ok`]: CommandResult::is_ok
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Tag of the completed transaction (empty for no-op results that sent
    /// no bytes).
    pub tag: String,
    /// Terminal status word.
    pub status: Status,
    /// Optional bracketed code on the terminal line.
    pub code: Option<ResponseCode>,
    /// Human-readable terminal text.
    pub text: String,
    /// Untagged responses received during the transaction, in wire order.
    pub responses: Vec<UntaggedResponse>,
}

impl CommandResult {
    /// Whether the transaction succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Referral targets carried on the terminal line, if any.
    #[must_use]
    pub fn referrals(&self) -> &[String] {
        self.code
            .as_ref()
            .and_then(ResponseCode::referral_targets)
            .unwrap_or(&[])
    }

    /// Fabricates a result for an operation satisfied without I/O.
    fn local(status: Status, text: impl Into<String>) -> Self {
        Self {
            tag: String::new(),
            status,
            code: None,
            text: text.into(),
            responses: Vec::new(),
        }
    }
}

/// Whole-transaction deadline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Instant,
    total: Duration,
}

impl Deadline {
    fn start(total: Option<Duration>) -> Option<Self> {
        total.map(|total| Self {
            at: Instant::now() + total,
            total,
        })
    }

    /// Time left, or the timeout error once spent.
    fn remaining(self) -> Result<Duration> {
        let left = self.at.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(Error::Timeout(self.total));
        }
        Ok(left)
    }
}

/// Tighter of a per-operation limit and a transaction deadline.
fn effective_limit(
    per_op: Option<Duration>,
    deadline: Option<Deadline>,
) -> Result<Option<Duration>> {
    let budget = deadline.map(Deadline::remaining).transpose()?;
    Ok(match (per_op, budget) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (limit, None) | (None, limit) => limit,
    })
}

/// A stateful protocol session over a duplex transport.
///
/// Generic over the transport so tests can drive it with an in-memory mock;
/// production code uses [`Session<Transport>`] via [`Session::connect`].
#[derive(Debug)]
pub struct Session<S> {
    stream: Option<FramedStream<S>>,
    state: SessionState,
    authority: Authority,
    capabilities: CapabilitySet,
    selected: Option<SelectedMailbox>,
    tags: TagSequence,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
    transaction_timeout: Option<Duration>,
    transaction_proceeding: bool,
    idling: bool,
    pending_append: Option<PendingAppend>,
    /// Strict incapability policy: missing capabilities raise
    /// [`Error::Incapable`] instead of reporting a failed result.
    incapable_as_error: bool,
    /// Strict referral policy: NO terminals carrying referral targets raise
    /// [`Error::Referral`] instead of a failed result.
    referral_as_error: bool,
    /// Whether the current transaction has refreshed the capability
    /// snapshot (untagged listing or bracketed code).
    caps_refreshed: bool,
}

impl Session<Transport> {
    /// Connects per the configuration and consumes the server greeting.
    ///
    /// For [`Security::StartTls`] the plaintext connection is upgraded in
    /// place before returning.
    pub async fn connect(config: &Config) -> Result<Self> {
        let connecting = async {
            match config.security {
                Security::Implicit => Transport::connect_secure(&config.host, config.port).await,
                Security::None | Security::StartTls => {
                    Transport::connect(&config.host, config.port).await
                }
            }
        };
        let transport = tokio::time::timeout(config.connect_timeout, connecting)
            .await
            .map_err(|_| Error::Timeout(config.connect_timeout))??;

        let authority = Authority::new(config.security.scheme(), &config.host, config.port);
        let mut session = Self::from_stream(transport, authority).await?;
        if config.security == Security::StartTls {
            session.start_tls(&config.host).await?;
        }
        Ok(session)
    }

    /// Issues STARTTLS and upgrades the transport in place.
    ///
    /// The capability snapshot taken before the upgrade is discarded and
    /// re-queried over the encrypted channel.
    pub async fn start_tls(&mut self, host: &str) -> Result<()> {
        self.negotiate_start_tls().await?;

        let framed = self.stream.take().ok_or_else(Self::not_connected)?;
        match framed.into_inner().upgrade(host).await {
            Ok(transport) => {
                self.stream = Some(FramedStream::new(transport));
                self.capabilities = CapabilitySet::default();
                self.capability().await?;
                Ok(())
            }
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an established transport and consumes the server greeting.
    ///
    /// An OK greeting lands in [`SessionState::NotAuthenticated`], a PREAUTH
    /// greeting in [`SessionState::Authenticated`]; a BYE greeting refuses
    /// the connection.
    pub async fn from_stream(stream: S, authority: Authority) -> Result<Self> {
        let mut session = Self {
            stream: Some(FramedStream::new(stream)),
            state: SessionState::NotConnected,
            authority,
            capabilities: CapabilitySet::default(),
            selected: None,
            tags: TagSequence::new(),
            send_timeout: Some(Duration::from_secs(30)),
            receive_timeout: Some(Duration::from_secs(30)),
            transaction_timeout: None,
            transaction_proceeding: false,
            idling: false,
            pending_append: None,
            incapable_as_error: true,
            referral_as_error: false,
            caps_refreshed: false,
        };
        session.handle_greeting().await?;
        Ok(session)
    }

    /// Gates and issues the STARTTLS command. A greeting without a
    /// capability code leaves the snapshot stale, so it is queried first.
    async fn negotiate_start_tls(&mut self) -> Result<()> {
        self.ensure_state("STARTTLS", &[SessionState::NotAuthenticated])?;
        self.refresh_capabilities_if_stale().await?;
        if !self.capabilities.has(&Capability::StartTls) {
            return Err(Error::Incapable(Capability::StartTls));
        }

        let result = self.run_transaction("STARTTLS", &[]).await?;
        if result.is_ok() {
            Ok(())
        } else {
            Err(Error::Connection(format!(
                "STARTTLS refused: {}",
                result.text
            )))
        }
    }

    async fn handle_greeting(&mut self) -> Result<()> {
        match self.read_response(None).await? {
            Response::Untagged(UntaggedResponse::Status { status, code, text }) => {
                if let Some(code) = &code {
                    self.apply_code(code);
                }
                match status {
                    Status::Ok => {
                        self.state = SessionState::NotAuthenticated;
                        debug!(authority = %self.authority, "connected");
                        Ok(())
                    }
                    Status::PreAuth => {
                        self.state = SessionState::Authenticated;
                        debug!(authority = %self.authority, "connected (pre-authenticated)");
                        Ok(())
                    }
                    Status::Bye => {
                        self.teardown();
                        Err(Error::Connection(format!("server refused session: {text}")))
                    }
                    Status::No | Status::Bad => {
                        self.teardown();
                        Err(Error::Protocol(format!("unexpected greeting: {text}")))
                    }
                }
            }
            _ => {
                self.teardown();
                Err(Error::Protocol("greeting is not a status line".to_string()))
            }
        }
    }

    // --- observers ---------------------------------------------------

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Identity of the connected server.
    #[must_use]
    pub const fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Latest capability snapshot.
    #[must_use]
    pub const fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// State of the selected mailbox, if one is selected.
    #[must_use]
    pub const fn selected_mailbox(&self) -> Option<&SelectedMailbox> {
        self.selected.as_ref()
    }

    /// Whether a transaction currently holds the session.
    #[must_use]
    pub const fn is_transaction_proceeding(&self) -> bool {
        self.transaction_proceeding
    }

    /// Whether an idle wait is open.
    #[must_use]
    pub const fn is_idling(&self) -> bool {
        self.idling
    }

    // --- policies and timeouts -----------------------------------------

    /// Chooses how missing capabilities are reported: an
    /// [`Error::Incapable`] (strict, the default) or a failed result.
    pub fn incapable_as_error(&mut self, strict: bool) {
        self.incapable_as_error = strict;
    }

    /// Chooses how referrals on NO terminals are reported: an
    /// [`Error::Referral`] (strict) or a failed result exposing
    /// [`CommandResult::referrals`] (the default).
    pub fn referral_as_error(&mut self, strict: bool) {
        self.referral_as_error = strict;
    }

    /// Sets the per-write timeout. Rejected while a transaction proceeds.
    pub fn set_send_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.ensure_no_transaction("change send timeout")?;
        self.send_timeout = timeout;
        Ok(())
    }

    /// Sets the per-read timeout. Rejected while a transaction proceeds.
    pub fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.ensure_no_transaction("change receive timeout")?;
        self.receive_timeout = timeout;
        Ok(())
    }

    /// Sets the whole-transaction deadline. Rejected while a transaction
    /// proceeds.
    pub fn set_transaction_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.ensure_no_transaction("change transaction timeout")?;
        self.transaction_timeout = timeout;
        Ok(())
    }

    /// Whether the given capability is advertised, applying the
    /// incapability policy: under the strict policy a missing capability
    /// is an [`Error::Incapable`], otherwise `Ok(false)`.
    pub fn require_capability(&self, cap: &Capability) -> Result<bool> {
        if self.capabilities.has(cap) {
            Ok(true)
        } else if self.incapable_as_error {
            Err(Error::Incapable(cap.clone()))
        } else {
            Ok(false)
        }
    }

    // --- generic commands ------------------------------------------------

    /// Runs an arbitrary command as one transaction.
    ///
    /// State validity is the caller's concern beyond being connected; the
    /// built-in wrappers gate their own commands.
    pub async fn execute(&mut self, name: &str, args: &[Argument]) -> Result<CommandResult> {
        if !self.state.is_connected() {
            return Err(Self::not_connected());
        }
        self.run_transaction(name, args).await
    }

    /// Runs NOOP, picking up any pending unsolicited responses.
    pub async fn noop(&mut self) -> Result<CommandResult> {
        if !self.state.is_connected() {
            return Err(Self::not_connected());
        }
        self.run_transaction("NOOP", &[]).await
    }

    /// Queries capabilities, replacing the snapshot.
    pub async fn capability(&mut self) -> Result<CommandResult> {
        if !self.state.is_connected() {
            return Err(Self::not_connected());
        }
        self.run_transaction("CAPABILITY", &[]).await
    }

    /// Returns the capability snapshot, querying the server first unless
    /// the snapshot was refreshed by the previous transaction.
    pub async fn fresh_capabilities(&mut self) -> Result<CapabilitySet> {
        if !self.caps_refreshed {
            self.capability().await?;
        }
        Ok(self.capabilities.clone())
    }

    /// Issues one CAPABILITY transaction when the last command carried no
    /// capability data.
    pub(crate) async fn refresh_capabilities_if_stale(&mut self) -> Result<()> {
        if !self.caps_refreshed {
            self.capability().await?;
        }
        Ok(())
    }

    // --- mailbox lifecycle -----------------------------------------------

    /// Selects a mailbox read-write.
    ///
    /// On success the session moves to [`SessionState::Selected`] and
    /// [`selected_mailbox`](Self::selected_mailbox) tracks the new mailbox;
    /// on a failed result the previous selection is kept.
    pub async fn select(&mut self, mailbox: &str) -> Result<CommandResult> {
        self.select_with("SELECT", mailbox, false).await
    }

    /// Selects a mailbox read-only.
    pub async fn examine(&mut self, mailbox: &str) -> Result<CommandResult> {
        self.select_with("EXAMINE", mailbox, true).await
    }

    async fn select_with(
        &mut self,
        command: &str,
        mailbox: &str,
        read_only: bool,
    ) -> Result<CommandResult> {
        self.ensure_state(
            command,
            &[SessionState::Authenticated, SessionState::Selected],
        )?;
        self.ensure_no_transaction(command)?;

        // Untagged data for the new mailbox arrives before the terminal, so
        // the fresh record must already be in place for the dispatcher.
        let previous = self.selected.replace(SelectedMailbox::new(mailbox, read_only));
        let args = [Argument::AString(mailbox.to_string())];

        match self.run_transaction(command, &args).await {
            Ok(result) if result.is_ok() => {
                self.state = SessionState::Selected;
                Ok(result)
            }
            Ok(result) => {
                self.selected = previous;
                Ok(result)
            }
            Err(e) => {
                if self.state.is_connected() {
                    self.selected = previous;
                }
                Err(e)
            }
        }
    }

    /// Closes the selected mailbox, expunging deleted messages.
    pub async fn close(&mut self) -> Result<CommandResult> {
        self.ensure_state("CLOSE", &[SessionState::Selected])?;
        let result = self.run_transaction("CLOSE", &[]).await?;
        if result.is_ok() {
            self.state = SessionState::Authenticated;
            self.selected = None;
        }
        Ok(result)
    }

    /// Closes the selected mailbox without expunging (UNSELECT extension).
    pub async fn unselect(&mut self) -> Result<CommandResult> {
        self.ensure_state("UNSELECT", &[SessionState::Selected])?;
        if !self.require_capability(&Capability::Unselect)? {
            return Ok(CommandResult::local(Status::No, "UNSELECT not supported"));
        }
        let result = self.run_transaction("UNSELECT", &[]).await?;
        if result.is_ok() {
            self.state = SessionState::Authenticated;
            self.selected = None;
        }
        Ok(result)
    }

    /// Deletes a mailbox. Deleting the currently selected mailbox drops
    /// the selection.
    pub async fn delete(&mut self, mailbox: &str) -> Result<CommandResult> {
        self.ensure_state(
            "DELETE",
            &[SessionState::Authenticated, SessionState::Selected],
        )?;
        let args = [Argument::AString(mailbox.to_string())];
        let result = self.run_transaction("DELETE", &args).await?;
        if result.is_ok()
            && let Some(selected) = &self.selected
            && selected.name == mailbox
        {
            self.state = SessionState::Authenticated;
            self.selected = None;
        }
        Ok(result)
    }

    // --- shutdown ----------------------------------------------------

    /// Logs out and tears the connection down.
    ///
    /// The server answers LOGOUT with BYE before the terminal; both orders
    /// are accepted.
    pub async fn logout(&mut self) -> Result<()> {
        if !self.state.is_connected() {
            return Ok(());
        }
        match self.run_transaction("LOGOUT", &[]).await {
            Ok(_) | Err(Error::Bye(_)) => {
                self.teardown();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Disconnects, optionally logging out first.
    ///
    /// Never fails: a broken connection is torn down regardless.
    pub async fn disconnect(&mut self, send_logout: bool) {
        if !self.state.is_connected() {
            return;
        }
        if send_logout && !self.transaction_proceeding {
            let _ = self.logout().await;
        }
        self.teardown();
    }

    // --- transaction engine --------------------------------------------

    pub(crate) fn ensure_state(&self, command: &str, valid: &[SessionState]) -> Result<()> {
        if self.state.is_connected() && valid.contains(&self.state) {
            return Ok(());
        }
        Err(Error::Protocol(format!(
            "{command} is not valid in the {} state",
            self.state
        )))
    }

    pub(crate) fn ensure_no_transaction(&self, operation: &str) -> Result<()> {
        if self.idling {
            return Err(Error::InvalidState(format!(
                "cannot {operation} while idling"
            )));
        }
        if let Some(pending) = &self.pending_append
            && !pending.is_settled()
        {
            return Err(Error::InvalidState(format!(
                "cannot {operation} while an append is pending"
            )));
        }
        if self.transaction_proceeding {
            return Err(Error::InvalidState(format!(
                "cannot {operation} while another transaction is proceeding"
            )));
        }
        Ok(())
    }

    /// Issues one complete transaction: render, tag, send, receive,
    /// terminal mapping. Fatal errors tear the connection down.
    pub(crate) async fn run_transaction(
        &mut self,
        name: &str,
        args: &[Argument],
    ) -> Result<CommandResult> {
        self.ensure_no_transaction(name)?;

        // Literal framing is resolved against the snapshot before the tag
        // is issued and before any bytes hit the wire.
        render_command("", name, args, &self.capabilities, self.incapable_as_error)?;
        let tag = self.tags.next();
        let chunks = render_command(&tag, name, args, &self.capabilities, self.incapable_as_error)?;

        self.transaction_proceeding = true;
        let outcome = self.drive(&tag, name, chunks).await;
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

    async fn drive(
        &mut self,
        tag: &str,
        name: &str,
        chunks: Vec<WireChunk>,
    ) -> Result<CommandResult> {
        let deadline = Deadline::start(self.transaction_timeout);
        debug!(tag, command = name, "transaction begins");
        self.caps_refreshed = false;
        let mut responses = Vec::new();

        for chunk in chunks {
            self.write_bytes(&chunk.line, deadline).await?;
            if let Some(payload) = chunk.literal {
                if payload.wait_for_continuation {
                    self.flush_stream(deadline).await?;
                    if let Some(tagged) =
                        self.await_continuation(tag, &mut responses, deadline).await?
                    {
                        // Early terminal instead of the continuation.
                        return self.finish(tagged, responses);
                    }
                }
                self.write_bytes(&payload.data, deadline).await?;
            }
        }
        self.flush_stream(deadline).await?;

        let tagged = self.receive_terminal(tag, &mut responses, deadline).await?;
        self.finish(tagged, responses)
    }

    /// Waits for a `+` continuation, applying untagged responses on the
    /// way. Returns a tagged terminal if the server refuses with one.
    pub(crate) async fn await_continuation(
        &mut self,
        tag: &str,
        responses: &mut Vec<UntaggedResponse>,
        deadline: Option<Deadline>,
    ) -> Result<Option<TaggedResponse>> {
        loop {
            match self.read_response(deadline).await? {
                Response::Continuation { .. } => return Ok(None),
                Response::Untagged(untagged) => {
                    self.accept_untagged(untagged, responses)?;
                }
                Response::Tagged(tagged) if tagged.tag == tag => return Ok(Some(tagged)),
                Response::Tagged(tagged) => {
                    return Err(Error::Protocol(format!(
                        "tag mismatch: expected {tag}, received {}",
                        tagged.tag
                    )));
                }
            }
        }
    }

    /// Reads until the tagged terminal for `tag`, applying untagged
    /// responses on the way.
    pub(crate) async fn receive_terminal(
        &mut self,
        tag: &str,
        responses: &mut Vec<UntaggedResponse>,
        deadline: Option<Deadline>,
    ) -> Result<TaggedResponse> {
        loop {
            match self.read_response(deadline).await? {
                Response::Untagged(untagged) => {
                    self.accept_untagged(untagged, responses)?;
                }
                Response::Continuation { .. } => {
                    return Err(Error::Protocol(
                        "unexpected continuation request".to_string(),
                    ));
                }
                Response::Tagged(tagged) if tagged.tag == tag => return Ok(tagged),
                Response::Tagged(tagged) => {
                    return Err(Error::Protocol(format!(
                        "tag mismatch: expected {tag}, received {}",
                        tagged.tag
                    )));
                }
            }
        }
    }

    /// Applies one untagged response to session state and buffers it.
    /// BYE aborts the transaction.
    fn accept_untagged(
        &mut self,
        untagged: UntaggedResponse,
        responses: &mut Vec<UntaggedResponse>,
    ) -> Result<()> {
        self.dispatch_untagged(&untagged);
        if let UntaggedResponse::Status {
            status: Status::Bye,
            text,
            ..
        } = &untagged
        {
            return Err(Error::Bye(text.clone()));
        }
        responses.push(untagged);
        Ok(())
    }

    /// Maps the tagged terminal onto a result or error.
    pub(crate) fn finish(
        &mut self,
        tagged: TaggedResponse,
        responses: Vec<UntaggedResponse>,
    ) -> Result<CommandResult> {
        if let Some(code) = &tagged.code {
            self.apply_code(code);
        }

        let result = CommandResult {
            tag: tagged.tag,
            status: tagged.status,
            code: tagged.code,
            text: tagged.text,
            responses,
        };

        match result.status {
            Status::Ok | Status::PreAuth => Ok(result),
            Status::No => {
                if self.referral_as_error && !result.referrals().is_empty() {
                    return Err(Error::Referral(result.referrals().to_vec()));
                }
                trace!(tag = %result.tag, text = %result.text, "command refused");
                Ok(result)
            }
            Status::Bad => Err(Error::Bad(result.text)),
            Status::Bye => Err(Error::Bye(result.text)),
        }
    }

    /// Applies an unsolicited response to session and mailbox state.
    pub(crate) fn dispatch_untagged(&mut self, untagged: &UntaggedResponse) {
        match untagged {
            UntaggedResponse::Capability(caps) => {
                self.capabilities = caps.clone();
                self.caps_refreshed = true;
            }
            UntaggedResponse::Exists(n) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.exists = *n;
                }
            }
            UntaggedResponse::Recent(n) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.recent = *n;
                }
            }
            UntaggedResponse::Expunge(_) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.on_expunge();
                }
            }
            UntaggedResponse::Flags(flags) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.applicable_flags = flags.clone();
                }
            }
            UntaggedResponse::Status { code, .. } => {
                if let Some(code) = code {
                    self.apply_code(code);
                }
            }
            UntaggedResponse::Other { .. } => {}
        }
    }

    fn apply_code(&mut self, code: &ResponseCode) {
        match code {
            ResponseCode::Capability(caps) => {
                self.capabilities = caps.clone();
                self.caps_refreshed = true;
            }
            ResponseCode::Unseen(n) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.first_unseen = Some(*n);
                }
            }
            ResponseCode::UidValidity(n) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.uid_validity = Some(*n);
                }
            }
            ResponseCode::UidNext(n) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.uid_next = Some(*n);
                }
            }
            ResponseCode::HighestModSeq(n) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.highest_mod_seq = Some(*n);
                }
            }
            ResponseCode::PermanentFlags(flags) => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.permanent_flags = flags.clone();
                }
            }
            ResponseCode::ReadOnly => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.read_only = true;
                }
            }
            ResponseCode::ReadWrite => {
                if let Some(mailbox) = &mut self.selected {
                    mailbox.read_only = false;
                }
            }
            ResponseCode::Alert => {
                warn!(authority = %self.authority, "server alert");
            }
            ResponseCode::TryCreate
            | ResponseCode::Referral(_)
            | ResponseCode::Other(..) => {}
        }
    }

    /// Drops the connection and resets all transient state. After teardown
    /// every command fails until a new session is established.
    pub(crate) fn teardown(&mut self) {
        if self.state.is_connected() {
            warn!(authority = %self.authority, "session torn down");
        }
        self.stream = None;
        self.state = SessionState::NotConnected;
        self.selected = None;
        self.transaction_proceeding = false;
        self.idling = false;
        self.pending_append = None;
    }

    // --- bounded I/O --------------------------------------------------

    pub(crate) fn not_connected() -> Error {
        Error::Protocol("session is not connected".to_string())
    }

    /// Reads and parses one response line, bounded by the receive timeout
    /// and the transaction deadline.
    pub(crate) async fn read_response(&mut self, deadline: Option<Deadline>) -> Result<Response> {
        let limit = effective_limit(self.receive_timeout, deadline)?;
        let stream = self.stream.as_mut().ok_or_else(Self::not_connected)?;
        let line = match limit {
            Some(limit) => tokio::time::timeout(limit, stream.read_line())
                .await
                .map_err(|_| Error::Timeout(limit))??,
            None => stream.read_line().await?,
        };
        trace!(line = %String::from_utf8_lossy(&line).trim_end(), "S:");
        ResponseParser::parse_line(&line)
    }

    /// Reads and parses one response line with no per-read bound; used by
    /// the idle wait where silence is expected.
    pub(crate) async fn read_response_unbounded(&mut self) -> Result<Response> {
        let stream = self.stream.as_mut().ok_or_else(Self::not_connected)?;
        let line = stream.read_line().await?;
        trace!(line = %String::from_utf8_lossy(&line).trim_end(), "S:");
        ResponseParser::parse_line(&line)
    }

    /// Buffers bytes for writing, bounded by the send timeout.
    pub(crate) async fn write_bytes(
        &mut self,
        data: &[u8],
        deadline: Option<Deadline>,
    ) -> Result<()> {
        let limit = effective_limit(self.send_timeout, deadline)?;
        let stream = self.stream.as_mut().ok_or_else(Self::not_connected)?;
        match limit {
            Some(limit) => tokio::time::timeout(limit, stream.write(data))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => stream.write(data).await,
        }
    }

    /// Flushes buffered output, bounded by the send timeout.
    pub(crate) async fn flush_stream(&mut self, deadline: Option<Deadline>) -> Result<()> {
        let limit = effective_limit(self.send_timeout, deadline)?;
        let stream = self.stream.as_mut().ok_or_else(Self::not_connected)?;
        match limit {
            Some(limit) => tokio::time::timeout(limit, stream.flush())
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => stream.flush().await,
        }
    }

    /// Issues the next tag.
    pub(crate) fn next_tag(&self) -> String {
        self.tags.next()
    }

    /// Deadline for the current transaction timeout setting.
    pub(crate) fn transaction_deadline(&self) -> Option<Deadline> {
        Deadline::start(self.transaction_timeout)
    }
}
