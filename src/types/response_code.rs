//! Bracketed response codes carried inside status responses.

use super::capability::CapabilitySet;
use super::flags::Flag;

/// Response code from a `[...]` section of a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// `[ALERT]` - message should be shown to the user.
    Alert,
    /// `[CAPABILITY ...]` piggybacked capability data.
    Capability(CapabilitySet),
    /// `[PERMANENTFLAGS (...)]`
    PermanentFlags(Vec<Flag>),
    /// `[READ-ONLY]`
    ReadOnly,
    /// `[READ-WRITE]`
    ReadWrite,
    /// `[UIDVALIDITY n]`
    UidValidity(u32),
    /// `[UIDNEXT n]`
    UidNext(u32),
    /// `[UNSEEN n]` - first unseen message number.
    Unseen(u32),
    /// `[HIGHESTMODSEQ n]` (CONDSTORE)
    HighestModSeq(u64),
    /// `[TRYCREATE]`
    TryCreate,
    /// `[REFERRAL url ...]` - login or mailbox referral targets.
    Referral(Vec<String>),
    /// Any other code, with its optional argument text.
    Other(String, Option<String>),
}

impl ResponseCode {
    /// Parses the inside of a bracketed response code.
    #[must_use]
    pub fn parse(inner: &str) -> Self {
        let inner = inner.trim();
        let (word, rest) = match inner.split_once(' ') {
            Some((w, r)) => (w, Some(r.trim())),
            None => (inner, None),
        };

        match (word.to_ascii_uppercase().as_str(), rest) {
            ("ALERT", _) => Self::Alert,
            ("CAPABILITY", Some(r)) => Self::Capability(CapabilitySet::parse(r)),
            ("PERMANENTFLAGS", Some(r)) => Self::PermanentFlags(Flag::parse_list(r)),
            ("READ-ONLY", _) => Self::ReadOnly,
            ("READ-WRITE", _) => Self::ReadWrite,
            ("UIDVALIDITY", Some(r)) => r.parse().map_or_else(
                |_| Self::Other(word.to_string(), rest.map(str::to_string)),
                Self::UidValidity,
            ),
            ("UIDNEXT", Some(r)) => r.parse().map_or_else(
                |_| Self::Other(word.to_string(), rest.map(str::to_string)),
                Self::UidNext,
            ),
            ("UNSEEN", Some(r)) => r.parse().map_or_else(
                |_| Self::Other(word.to_string(), rest.map(str::to_string)),
                Self::Unseen,
            ),
            ("HIGHESTMODSEQ", Some(r)) => r.parse().map_or_else(
                |_| Self::Other(word.to_string(), rest.map(str::to_string)),
                Self::HighestModSeq,
            ),
            ("TRYCREATE", _) => Self::TryCreate,
            ("REFERRAL", Some(r)) => Self::Referral(
                r.split_ascii_whitespace()
                    .map(str::to_string)
                    .collect(),
            ),
            _ => Self::Other(word.to_string(), rest.map(str::to_string)),
        }
    }

    /// Referral targets, if this code carries any.
    #[must_use]
    pub fn referral_targets(&self) -> Option<&[String]> {
        match self {
            Self::Referral(targets) => Some(targets),
            _ => None,
        }
    }
}
