//! Literal payload framing negotiation.
//!
//! A literal argument can be sent in four wire forms: `{n}` (synchronizing),
//! `{n+}` (non-synchronizing), and their `~`-prefixed binary variants.
//! Always synchronizing costs one round trip per literal; non-synchronizing
//! against a server without LITERAL+ is a protocol violation. The negotiator
//! picks the cheapest legal form from the requested options and the live
//! capability snapshot.

use crate::types::{Capability, CapabilitySet};
use crate::{Error, Result};

/// Synchronization axis of a literal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Plain `{n}`: flush and block for `+` before sending payload bytes.
    #[default]
    Synchronizing,
    /// `{n+}` unconditionally; requires LITERAL+ on the server.
    NonSynchronizing,
    /// `{n+}` when LITERAL+ is advertised, silent fallback to `{n}` otherwise.
    NonSynchronizingIfCapable,
}

/// Literal-mode axis of a literal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralMode {
    /// Plain literal.
    #[default]
    Literal,
    /// `~`-prefixed binary literal unconditionally; requires BINARY.
    Literal8,
    /// `~` prefix when BINARY is advertised, silent fallback otherwise.
    Literal8IfCapable,
}

/// Requested framing options for one literal argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiteralOptions {
    /// Synchronization request.
    pub sync: SyncMode,
    /// Literal-mode request.
    pub mode: LiteralMode,
}

impl LiteralOptions {
    /// Synchronizing plain literal (the default).
    #[must_use]
    pub const fn synchronizing() -> Self {
        Self {
            sync: SyncMode::Synchronizing,
            mode: LiteralMode::Literal,
        }
    }

    /// Non-synchronizing when the server is capable, else synchronizing.
    #[must_use]
    pub const fn non_sync_if_capable() -> Self {
        Self {
            sync: SyncMode::NonSynchronizingIfCapable,
            mode: LiteralMode::Literal,
        }
    }
}

/// Resolved wire form of one literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralForm {
    /// Send payload immediately, no continuation wait.
    pub non_sync: bool,
    /// Emit the `~` binary prefix.
    pub literal8: bool,
}

impl LiteralForm {
    /// Renders the header for a payload of `len` bytes, without CRLF.
    #[must_use]
    pub fn header(self, len: u64) -> String {
        match (self.literal8, self.non_sync) {
            (false, false) => format!("{{{len}}}"),
            (false, true) => format!("{{{len}+}}"),
            (true, false) => format!("~{{{len}}}"),
            (true, true) => format!("~{{{len}+}}"),
        }
    }
}

/// Resolves requested options against the live capability snapshot.
///
/// If-capable forms fall back silently. Unconditional forms are kept as
/// requested; when the capability is missing they fail with
/// [`Error::Incapable`] under the strict policy and are sent anyway under
/// the lenient one. The check happens before any I/O.
///
/// # Errors
///
/// [`Error::Incapable`] for an unconditional request the server cannot
/// honor, under the strict policy only.
pub fn resolve(
    options: LiteralOptions,
    capabilities: &CapabilitySet,
    strict: bool,
) -> Result<LiteralForm> {
    let plus = capabilities.has(&Capability::LiteralPlus);
    let binary = capabilities.has(&Capability::Binary);

    let non_sync = match options.sync {
        SyncMode::Synchronizing => false,
        SyncMode::NonSynchronizingIfCapable => plus,
        SyncMode::NonSynchronizing => {
            if strict && !plus {
                return Err(Error::Incapable(Capability::LiteralPlus));
            }
            true
        }
    };

    let literal8 = match options.mode {
        LiteralMode::Literal => false,
        LiteralMode::Literal8IfCapable => binary,
        LiteralMode::Literal8 => {
            if strict && !binary {
                return Err(Error::Incapable(Capability::Binary));
            }
            true
        }
    };

    Ok(LiteralForm { non_sync, literal8 })
}
