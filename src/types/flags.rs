//! Message flags.

/// A message flag, either a system flag or a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `\Seen`
    Seen,
    /// `\Answered`
    Answered,
    /// `\Flagged`
    Flagged,
    /// `\Deleted`
    Deleted,
    /// `\Draft`
    Draft,
    /// `\Recent`
    Recent,
    /// `\*` inside PERMANENTFLAGS: clients may create keywords.
    Wildcard,
    /// Custom keyword flag.
    Keyword(String),
}

impl Flag {
    /// Parses a flag token.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            _ if s.eq_ignore_ascii_case("\\Seen") => Self::Seen,
            _ if s.eq_ignore_ascii_case("\\Answered") => Self::Answered,
            _ if s.eq_ignore_ascii_case("\\Flagged") => Self::Flagged,
            _ if s.eq_ignore_ascii_case("\\Deleted") => Self::Deleted,
            _ if s.eq_ignore_ascii_case("\\Draft") => Self::Draft,
            _ if s.eq_ignore_ascii_case("\\Recent") => Self::Recent,
            "\\*" => Self::Wildcard,
            _ => Self::Keyword(s.to_string()),
        }
    }

    /// Wire spelling of the flag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Wildcard => "\\*",
            Self::Keyword(s) => s,
        }
    }

    /// Parses a parenthesized flag list such as `(\Seen \Draft)`.
    #[must_use]
    pub fn parse_list(s: &str) -> Vec<Self> {
        s.trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split_ascii_whitespace()
            .map(Self::parse)
            .collect()
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
