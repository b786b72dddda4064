//! Server capability tokens and the immutable capability snapshot.

/// Server capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` baseline (RFC 3501)
    Imap4Rev1,
    /// IDLE long-poll command (RFC 2177)
    Idle,
    /// LITERAL+ non-synchronizing literals (RFC 7888)
    LiteralPlus,
    /// BINARY literals, `~{n}` form (RFC 3516)
    Binary,
    /// SASL initial response inside AUTHENTICATE (RFC 4959)
    SaslIr,
    /// ENABLE command (RFC 5161)
    Enable,
    /// CONDSTORE modification sequences (RFC 7162)
    CondStore,
    /// UIDPLUS, including UID EXPUNGE (RFC 4315)
    UidPlus,
    /// MULTIAPPEND (RFC 3502)
    MultiAppend,
    /// LIST-EXTENDED (RFC 5258)
    ListExtended,
    /// METADATA (RFC 5464)
    Metadata,
    /// QUOTA (RFC 2087)
    Quota,
    /// SORT (RFC 5256)
    Sort,
    /// THREAD, with algorithm name (RFC 5256)
    Thread(String),
    /// ESEARCH / saved search result (RFC 4731/5182)
    SearchRes,
    /// LANGUAGE negotiation (RFC 5255)
    Language,
    /// NAMESPACE (RFC 2342)
    Namespace,
    /// UNSELECT command (RFC 3691)
    Unselect,
    /// Server hands out login referrals (RFC 2221)
    LoginReferrals,
    /// Server hands out mailbox referrals (RFC 2193)
    MailboxReferrals,
    /// STARTTLS upgrade offered
    StartTls,
    /// LOGIN disabled (pre-STARTTLS)
    LoginDisabled,
    /// SASL mechanism advertisement
    Auth(String),
    /// Anything the engine does not model
    Unknown(String),
}

impl Capability {
    /// Parses a capability token.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IDLE" => Self::Idle,
            "LITERAL+" => Self::LiteralPlus,
            "BINARY" => Self::Binary,
            "SASL-IR" => Self::SaslIr,
            "ENABLE" => Self::Enable,
            "CONDSTORE" => Self::CondStore,
            "UIDPLUS" => Self::UidPlus,
            "MULTIAPPEND" => Self::MultiAppend,
            "LIST-EXTENDED" => Self::ListExtended,
            "METADATA" => Self::Metadata,
            "QUOTA" => Self::Quota,
            "SORT" => Self::Sort,
            "ESEARCH" | "SEARCHRES" => Self::SearchRes,
            "LANGUAGE" => Self::Language,
            "NAMESPACE" => Self::Namespace,
            "UNSELECT" => Self::Unselect,
            "LOGIN-REFERRALS" => Self::LoginReferrals,
            "MAILBOX-REFERRALS" => Self::MailboxReferrals,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            _ if upper.starts_with("AUTH=") => Self::Auth(s[5..].to_ascii_uppercase()),
            _ if upper.starts_with("THREAD=") => Self::Thread(s[7..].to_ascii_uppercase()),
            _ => Self::Unknown(s.to_string()),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => write!(f, "IMAP4rev1"),
            Self::Idle => write!(f, "IDLE"),
            Self::LiteralPlus => write!(f, "LITERAL+"),
            Self::Binary => write!(f, "BINARY"),
            Self::SaslIr => write!(f, "SASL-IR"),
            Self::Enable => write!(f, "ENABLE"),
            Self::CondStore => write!(f, "CONDSTORE"),
            Self::UidPlus => write!(f, "UIDPLUS"),
            Self::MultiAppend => write!(f, "MULTIAPPEND"),
            Self::ListExtended => write!(f, "LIST-EXTENDED"),
            Self::Metadata => write!(f, "METADATA"),
            Self::Quota => write!(f, "QUOTA"),
            Self::Sort => write!(f, "SORT"),
            Self::Thread(alg) => write!(f, "THREAD={alg}"),
            Self::SearchRes => write!(f, "SEARCHRES"),
            Self::Language => write!(f, "LANGUAGE"),
            Self::Namespace => write!(f, "NAMESPACE"),
            Self::Unselect => write!(f, "UNSELECT"),
            Self::LoginReferrals => write!(f, "LOGIN-REFERRALS"),
            Self::MailboxReferrals => write!(f, "MAILBOX-REFERRALS"),
            Self::StartTls => write!(f, "STARTTLS"),
            Self::LoginDisabled => write!(f, "LOGINDISABLED"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// Read-only snapshot of the server's advertised capabilities.
///
/// Never mutated in place: whenever new capability data arrives (greeting,
/// untagged CAPABILITY, or a `[CAPABILITY ...]` code on a tagged OK), the
/// session replaces its snapshot wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    caps: Vec<Capability>,
}

impl CapabilitySet {
    /// Creates a snapshot from parsed capabilities.
    #[must_use]
    pub fn new(caps: Vec<Capability>) -> Self {
        Self { caps }
    }

    /// Parses a whitespace-separated capability listing.
    #[must_use]
    pub fn parse(tokens: &str) -> Self {
        Self {
            caps: tokens
                .split_ascii_whitespace()
                .map(Capability::parse)
                .collect(),
        }
    }

    /// Whether the given capability was advertised.
    #[must_use]
    pub fn has(&self, cap: &Capability) -> bool {
        self.caps.contains(cap)
    }

    /// Whether the given SASL mechanism was advertised.
    #[must_use]
    pub fn has_auth_mechanism(&self, mechanism: &str) -> bool {
        self.caps
            .iter()
            .any(|c| matches!(c, Capability::Auth(m) if m.eq_ignore_ascii_case(mechanism)))
    }

    /// Iterates over the advertised capabilities.
    pub fn iter(&self) -> std::slice::Iter<'_, Capability> {
        self.caps.iter()
    }

    /// Whether the snapshot holds no capabilities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a Capability;
    type IntoIter = std::slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.caps.iter()
    }
}
