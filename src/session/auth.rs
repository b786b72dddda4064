//! Authentication: LOGIN and the SASL AUTHENTICATE exchange.
//!
//! The exchange is challenge/response over base64-encoded continuation
//! lines. When the server advertises SASL-IR the initial response rides on
//! the AUTHENTICATE line itself; otherwise it answers the first (empty)
//! challenge. A mechanism without a credential fails locally, before any
//! bytes are sent.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::{CommandResult, Deadline, Session, SessionState};
use crate::command::Argument;
use crate::parser::{Response, UntaggedResponse};
use crate::types::{Capability, Status};
use crate::{Error, Result};

/// A username/secret pair.
#[derive(Clone)]
pub struct Credential {
    /// Account name.
    pub user: String,
    /// Password or token.
    pub secret: String,
}

impl Credential {
    /// Creates a credential.
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("secret", &"***")
            .finish()
    }
}

/// A SASL mechanism driven by the session during AUTHENTICATE.
///
/// Challenges arrive decoded; responses are returned raw and encoded by
/// the session. An error from [`respond`](Self::respond) aborts the
/// exchange with `*` before it is reported.
pub trait AuthMechanism {
    /// Mechanism name as advertised in `AUTH=` capabilities.
    fn name(&self) -> &str;

    /// The credential this mechanism would authenticate with, if it has
    /// one. Without a credential the exchange fails locally.
    fn credential(&self) -> Option<&Credential>;

    /// Optional initial response, sent on the command line when the server
    /// supports SASL-IR and as the answer to the first challenge otherwise.
    fn initial_response(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Answers a server challenge.
    fn respond(&mut self, challenge: &[u8]) -> Result<Vec<u8>>;
}

/// The PLAIN mechanism (RFC 4616): a single `\0user\0secret` response.
#[derive(Debug)]
pub struct PlainMechanism {
    credential: Credential,
}

impl PlainMechanism {
    /// Creates a PLAIN mechanism over the credential.
    #[must_use]
    pub const fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl AuthMechanism for PlainMechanism {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn credential(&self) -> Option<&Credential> {
        Some(&self.credential)
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>> {
        let mut blob = Vec::new();
        blob.push(0);
        blob.extend_from_slice(self.credential.user.as_bytes());
        blob.push(0);
        blob.extend_from_slice(self.credential.secret.as_bytes());
        Ok(Some(blob))
    }

    fn respond(&mut self, _challenge: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Auth(
            "PLAIN expects no challenge beyond the initial response".to_string(),
        ))
    }
}

/// The legacy LOGIN mechanism: username and password answered to two
/// prompts in order.
#[derive(Debug)]
pub struct LoginMechanism {
    credential: Credential,
    step: u8,
}

impl LoginMechanism {
    /// Creates a LOGIN mechanism over the credential.
    #[must_use]
    pub const fn new(credential: Credential) -> Self {
        Self {
            credential,
            step: 0,
        }
    }
}

impl AuthMechanism for LoginMechanism {
    fn name(&self) -> &str {
        "LOGIN"
    }

    fn credential(&self) -> Option<&Credential> {
        Some(&self.credential)
    }

    fn respond(&mut self, _challenge: &[u8]) -> Result<Vec<u8>> {
        let reply = match self.step {
            0 => self.credential.user.as_bytes().to_vec(),
            1 => self.credential.secret.as_bytes().to_vec(),
            _ => {
                return Err(Error::Auth(
                    "LOGIN expects exactly two challenges".to_string(),
                ));
            }
        };
        self.step += 1;
        Ok(reply)
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticates with LOGIN.
    ///
    /// A no-op success when already authenticated. Refused locally when
    /// the server advertises LOGINDISABLED.
    pub async fn login(&mut self, user: &str, secret: &str) -> Result<CommandResult> {
        if self.state.is_authenticated() {
            return Ok(CommandResult::local(Status::Ok, "already authenticated"));
        }
        self.ensure_state("LOGIN", &[SessionState::NotAuthenticated])?;
        if self.capabilities().has(&Capability::LoginDisabled) {
            return Err(Error::Auth("LOGIN is disabled by the server".to_string()));
        }

        let args = [
            Argument::AString(user.to_string()),
            Argument::AString(secret.to_string()),
        ];
        let result = self.run_transaction("LOGIN", &args).await?;
        if result.is_ok() {
            self.complete_authentication(user).await?;
        }
        Ok(result)
    }

    /// Authenticates with a SASL mechanism.
    ///
    /// A no-op success when already authenticated. A mechanism the server
    /// does not advertise is reported per the incapability policy, and a
    /// mechanism without a credential fails as a result; neither sends any
    /// bytes.
    pub async fn authenticate(&mut self, mechanism: &mut dyn AuthMechanism) -> Result<CommandResult> {
        if self.state.is_authenticated() {
            return Ok(CommandResult::local(Status::Ok, "already authenticated"));
        }
        self.ensure_state("AUTHENTICATE", &[SessionState::NotAuthenticated])?;
        self.ensure_no_transaction("AUTHENTICATE")?;

        let name = mechanism.name().to_ascii_uppercase();
        if !self.capabilities().has_auth_mechanism(&name) {
            if self.incapable_as_error {
                return Err(Error::Incapable(Capability::Auth(name)));
            }
            return Ok(CommandResult::local(
                Status::No,
                format!("server does not advertise AUTH={name}"),
            ));
        }
        let Some(credential) = mechanism.credential() else {
            return Ok(CommandResult::local(
                Status::No,
                format!("no credential available for {name}"),
            ));
        };
        let user = credential.user.clone();

        let tag = self.next_tag();
        self.transaction_proceeding = true;
        let outcome = self.drive_authenticate(&tag, &name, mechanism).await;
        self.transaction_proceeding = false;

        match outcome {
            Ok(result) => {
                if result.is_ok() {
                    self.complete_authentication(&user).await?;
                } else {
                    debug!(mechanism = %name, text = %result.text, "authentication refused");
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

    async fn complete_authentication(&mut self, user: &str) -> Result<()> {
        self.state = SessionState::Authenticated;
        self.authority.user = Some(user.to_string());
        debug!(authority = %self.authority, "authenticated");
        // Post-authentication capabilities differ; take a fresh snapshot
        // unless the terminal already piggybacked one.
        self.refresh_capabilities_if_stale().await
    }

    async fn drive_authenticate(
        &mut self,
        tag: &str,
        name: &str,
        mechanism: &mut dyn AuthMechanism,
    ) -> Result<CommandResult> {
        let deadline = self.transaction_deadline();
        self.caps_refreshed = false;
        let mut initial = mechanism.initial_response()?;

        let mut line = format!("{tag} AUTHENTICATE {name}");
        if self.capabilities().has(&Capability::SaslIr)
            && let Some(ir) = initial.take()
        {
            line.push(' ');
            if ir.is_empty() {
                line.push('=');
            } else {
                line.push_str(&BASE64.encode(&ir));
            }
        }
        line.push_str("\r\n");
        self.write_bytes(line.as_bytes(), deadline).await?;
        self.flush_stream(deadline).await?;

        let mut responses = Vec::new();
        loop {
            match self.read_response(deadline).await? {
                Response::Continuation { text } => {
                    let reply = match answer_challenge(&text, &mut initial, mechanism) {
                        Ok(reply) => reply,
                        Err(e) => {
                            self.abort_exchange(tag, &mut responses, deadline).await?;
                            return Err(e);
                        }
                    };
                    let mut out = BASE64.encode(&reply).into_bytes();
                    out.extend_from_slice(b"\r\n");
                    self.write_bytes(&out, deadline).await?;
                    self.flush_stream(deadline).await?;
                }
                Response::Untagged(untagged) => {
                    self.accept_untagged(untagged, &mut responses)?;
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

    /// Cancels the exchange with `*` and drains the tagged refusal.
    async fn abort_exchange(
        &mut self,
        tag: &str,
        responses: &mut Vec<UntaggedResponse>,
        deadline: Option<Deadline>,
    ) -> Result<()> {
        self.write_bytes(b"*\r\n", deadline).await?;
        self.flush_stream(deadline).await?;
        let _ = self.receive_terminal(tag, responses, deadline).await?;
        Ok(())
    }
}

fn answer_challenge(
    text: &str,
    initial: &mut Option<Vec<u8>>,
    mechanism: &mut dyn AuthMechanism,
) -> Result<Vec<u8>> {
    if let Some(ir) = initial.take() {
        return Ok(ir);
    }
    let challenge = if text.is_empty() {
        Vec::new()
    } else {
        BASE64
            .decode(text.trim())
            .map_err(|_| Error::Auth("server challenge is not valid base64".to_string()))?
    };
    mechanism.respond(&challenge)
}
