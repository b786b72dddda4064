//! Logical endpoint identity of a session.

/// The scheme/user/host/port identity a session is bound to.
///
/// Purely descriptive: the engine uses it for logging and for callers that
/// key connection pools by endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    /// URI scheme, `imap` or `imaps`.
    pub scheme: String,
    /// Authenticated user, once known.
    pub user: Option<String>,
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Authority {
    /// Creates an authority without a user component.
    #[must_use]
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            user: None,
            host: host.into(),
            port,
        }
    }

    /// Returns a copy with the user component set.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}://{}@{}:{}", self.scheme, user, self.host, self.port),
            None => write!(f, "{}://{}:{}", self.scheme, self.host, self.port),
        }
    }
}
