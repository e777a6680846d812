use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The fixed set of incident categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    It,
    Safety,
    Facilities,
    Other,
}

impl Category {
    pub const ALL: [Self; 4] = [Self::It, Self::Safety, Self::Facilities, Self::Other];

    const fn as_str(self) -> &'static str {
        match self {
            Self::It => "IT",
            Self::Safety => "SAFETY",
            Self::Facilities => "FACILITIES",
            Self::Other => "OTHER",
        }
    }
}

/// How bad an incident is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// The four lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Open,
    Investigating,
    Resolved,
    Archived,
}

/// The kind of edge taken through the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Forward progress: open -> investigating -> resolved.
    Advance,
    /// Move into the archived side-state.
    Archive,
    /// Leave the archived side-state.
    Unarchive,
}

/// Every legal edge of the incident lifecycle.
///
/// ```text
/// OPEN --advance--> INVESTIGATING --advance--> RESOLVED
/// OPEN --archive--> ARCHIVED <--archive-- RESOLVED
/// ARCHIVED --unarchive--> OPEN
/// ```
pub const LIFECYCLE: &[(Status, Action, Status)] = &[
    (Status::Open, Action::Advance, Status::Investigating),
    (Status::Investigating, Action::Advance, Status::Resolved),
    (Status::Open, Action::Archive, Status::Archived),
    (Status::Resolved, Action::Archive, Status::Archived),
    (Status::Archived, Action::Unarchive, Status::Open),
];

impl Status {
    pub const ALL: [Self; 4] = [
        Self::Open,
        Self::Investigating,
        Self::Resolved,
        Self::Archived,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Investigating => "INVESTIGATING",
            Self::Resolved => "RESOLVED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Where `action` leads from this state, if the lifecycle has such an edge.
    #[must_use]
    pub fn apply(self, action: Action) -> Option<Self> {
        LIFECYCLE
            .iter()
            .find(|(from, edge, _)| *from == self && *edge == action)
            .map(|(_, _, to)| *to)
    }

    /// Targets reachable from this state through `action`.
    #[must_use]
    pub fn targets(self, action: Action) -> Vec<Self> {
        LIFECYCLE
            .iter()
            .filter(|(from, edge, _)| *from == self && *edge == action)
            .map(|(_, _, to)| *to)
            .collect()
    }

    /// States from which `action` is legal.
    #[must_use]
    pub fn sources(action: Action) -> Vec<Self> {
        LIFECYCLE
            .iter()
            .filter(|(_, edge, _)| *edge == action)
            .map(|(from, _, _)| *from)
            .collect()
    }

    /// Whether an archive edge leaves this state.
    #[must_use]
    pub fn is_archivable(self) -> bool {
        self.apply(Action::Archive).is_some()
    }
}

/// A tracked operational incident, as stored on disk and returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    pub status: Status,
    pub reported_at: DateTime<Utc>,
}

/// The four caller-controlled fields of a new incident, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "IT" => Ok(Self::It),
            "SAFETY" => Ok(Self::Safety),
            "FACILITIES" => Ok(Self::Facilities),
            "OTHER" => Ok(Self::Other),
            _ => Err(ParseEnumError {
                expected: "category",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(ParseEnumError {
                expected: "severity",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "OPEN" => Ok(Self::Open),
            "INVESTIGATING" => Ok(Self::Investigating),
            "RESOLVED" => Ok(Self::Resolved),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}
