//! Session connection states.

/// Connection state of a session.
///
/// Transitions are driven only by command outcomes and teardown:
///
/// ```text
/// NotConnected -> NotAuthenticated   (greeting OK)
/// NotConnected -> Authenticated      (greeting PREAUTH)
/// NotAuthenticated -> Authenticated  (LOGIN / AUTHENTICATE success)
/// Authenticated -> Selected          (SELECT / EXAMINE success)
/// Selected -> Authenticated          (CLOSE / UNSELECT, or DELETE of the
///                                     selected mailbox)
/// any -> NotConnected                (LOGOUT, BYE, or fatal teardown)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No usable connection.
    #[default]
    NotConnected,
    /// Connected, greeting seen, not yet authenticated.
    NotAuthenticated,
    /// Authenticated, no mailbox selected.
    Authenticated,
    /// Authenticated with a mailbox selected.
    Selected,
}

impl SessionState {
    /// Whether a connection exists in this state.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        !matches!(self, Self::NotConnected)
    }

    /// Whether authentication has completed in this state.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::Selected)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotConnected => "not connected",
            Self::NotAuthenticated => "not authenticated",
            Self::Authenticated => "authenticated",
            Self::Selected => "selected",
        };
        f.write_str(name)
    }
}
