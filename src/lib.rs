//! # imap-engine
//!
//! A stateful IMAP4 client engine implementing RFC 3501 transaction
//! semantics over async I/O.
//!
//! ## Features
//!
//! - **Strict state machine**: `NotConnected` → `NotAuthenticated` →
//!   `Authenticated` → `Selected`, enforced before any bytes are sent
//! - **Single-flight transactions**: one tagged command at a time, with
//!   zero-padded decimal tags and fatal teardown on tag mismatch
//! - **Literal negotiation**: `{n}`, `{n+}`, `~{n}`, `~{n+}` framing
//!   resolved against LITERAL+ / BINARY capabilities per literal
//! - **IDLE support**: the session itself is the receive loop while
//!   idling; no background reader (RFC 2177)
//! - **Streamed APPEND**: known-length bodies stream straight to the wire,
//!   unknown-length bodies are framed on close
//! - **SASL AUTHENTICATE**: PLAIN and LOGIN built in, extensible through
//!   [`AuthMechanism`], with SASL-IR when advertised (RFC 4959)
//! - **TLS via rustls**: implicit TLS or in-place STARTTLS upgrade
//!
//! ## Example
//!
//! ```no_run
//! use imap_engine::{Config, Session};
//!
//! # async fn run() -> imap_engine::Result<()> {
//! let config = Config::new("mail.example.com");
//! let mut session = Session::connect(&config).await?;
//!
//! let result = session.login("alice", "secret").await?;
//! if !result.is_ok() {
//!     return Err(imap_engine::Error::Auth(result.text));
//! }
//!
//! session.select("INBOX").await?;
//! if let Some(mailbox) = session.selected_mailbox() {
//!     println!("{} messages", mailbox.exists);
//! }
//!
//! session.logout().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod session;
pub mod types;

pub use command::{Argument, LiteralMode, LiteralOptions, SyncMode};
pub use connection::{Config, Security, Transport};
pub use error::{Error, Result};
pub use parser::{Response, TaggedResponse, UntaggedResponse};
pub use session::{
    AuthMechanism, CommandResult, Credential, IdleHandle, LoginMechanism, PlainMechanism, Session,
    SessionState,
};
pub use types::{
    Authority, Capability, CapabilitySet, Flag, ResponseCode, SelectedMailbox, Status,
};
