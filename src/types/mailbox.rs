//! Live state of the currently selected mailbox.

use super::flags::Flag;

/// State of the selected mailbox, mutated only by unsolicited responses
/// (and codes on tagged responses) delivered in wire arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedMailbox {
    /// Mailbox name as given to SELECT/EXAMINE.
    pub name: String,
    /// Current message count (EXISTS).
    pub exists: u32,
    /// Recent message count (RECENT).
    pub recent: u32,
    /// First unseen message number, if reported.
    pub first_unseen: Option<u32>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<u32>,
    /// Predicted next UID.
    pub uid_next: Option<u32>,
    /// Highest modification sequence (CONDSTORE).
    pub highest_mod_seq: Option<u64>,
    /// Flags applicable in this mailbox.
    pub applicable_flags: Vec<Flag>,
    /// Flags the client can change permanently.
    pub permanent_flags: Vec<Flag>,
    /// Whether the mailbox was opened read-only (EXAMINE, or `[READ-ONLY]`).
    pub read_only: bool,
}

impl SelectedMailbox {
    /// Creates the record for a freshly selected mailbox.
    #[must_use]
    pub fn new(name: impl Into<String>, read_only: bool) -> Self {
        Self {
            name: name.into(),
            read_only,
            ..Self::default()
        }
    }

    /// Applies an EXPUNGE notification.
    ///
    /// The count floors at zero even if the server over-reports.
    pub fn on_expunge(&mut self) {
        self.exists = self.exists.saturating_sub(1);
        self.recent = self.recent.saturating_sub(1);
    }
}
