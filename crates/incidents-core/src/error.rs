use std::fmt;

/// Machine-readable error codes for callers that map failures to outward signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    IncidentNotFound,
    InvalidStateTransition,
    NotArchivable,
    NotArchived,
    ValidationFailed,
    CorruptStore,
    StoreWriteFailed,
    LockContention,
    StoreReadFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::IncidentNotFound => "E2001",
            Self::InvalidStateTransition => "E2002",
            Self::NotArchivable => "E2003",
            Self::NotArchived => "E2004",
            Self::ValidationFailed => "E2005",
            Self::CorruptStore => "E3001",
            Self::StoreWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::StoreReadFailed => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Incident store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::IncidentNotFound => "Incident not found",
            Self::InvalidStateTransition => "Invalid status transition",
            Self::NotArchivable => "Incident cannot be archived from its current status",
            Self::NotArchived => "Incident is not archived",
            Self::ValidationFailed => "Incident payload failed validation",
            Self::CorruptStore => "Corrupt incident store file",
            Self::StoreWriteFailed => "Incident store write failed",
            Self::LockContention => "Lock contention",
            Self::StoreReadFailed => "Incident store read failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Snake-case identifier used in structured CLI error output.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::ConfigParseError => "config_parse_error",
            Self::IncidentNotFound => "incident_not_found",
            Self::InvalidStateTransition => "invalid_transition",
            Self::NotArchivable => "not_archivable",
            Self::NotArchived => "not_archived",
            Self::ValidationFailed => "validation_failed",
            Self::CorruptStore => "corrupt_store",
            Self::StoreWriteFailed => "store_write_failed",
            Self::LockContention => "lock_contention",
            Self::StoreReadFailed => "store_read_failed",
            Self::InternalUnexpected => "internal_unexpected",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `inc init` to create the incident store."),
            Self::ConfigParseError => Some("Fix syntax in .incidents/config.toml and retry."),
            Self::IncidentNotFound => Some("Check the incident ID with `inc list --all`."),
            Self::InvalidStateTransition => {
                Some("Follow valid transitions: OPEN -> INVESTIGATING -> RESOLVED.")
            }
            Self::NotArchivable => Some("Only OPEN or RESOLVED incidents can be archived."),
            Self::NotArchived => Some("Only ARCHIVED incidents can be unarchived."),
            Self::ValidationFailed => Some(
                "Title needs 5+ characters, description 10+, category IT|SAFETY|FACILITIES|OTHER, severity LOW|MEDIUM|HIGH.",
            ),
            Self::CorruptStore => {
                Some("The corrupt file was moved aside; inspect the .corrupt-* copy.")
            }
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Retry after the other `inc` process releases the store lock.")
            }
            Self::StoreReadFailed => Some("Check read permissions on the data directory."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
