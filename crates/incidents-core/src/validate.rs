//! Input and transition gatekeeping.
//!
//! Both checks are pure: they see a payload or a pair of states and never
//! touch the store. The store runs [`validate_transition`] itself before every
//! status mutation.

use crate::model::incident::{Action, Category, NewIncident, Severity, Status};
use serde::Deserialize;
use std::fmt;

pub const MIN_TITLE_LEN: usize = 5;
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Raw create payload as received from a caller.
///
/// Every field is optional so that missing values surface as validation
/// errors rather than deserialization failures. Unknown keys (a smuggled
/// `status` or `id`, for instance) are dropped on deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

impl CreatePayload {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            category: Some(category.into()),
            severity: Some(severity.into()),
        }
    }
}

/// One violated field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub value: Option<String>,
    pub reason: String,
}

impl FieldError {
    fn new(field: &'static str, value: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "invalid {} '{}': {}", self.field, value, self.reason),
            None => write!(f, "invalid {}: {}", self.field, self.reason),
        }
    }
}

/// Every field violation found in a create payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_field_errors(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    /// Names of the violated fields, in check order.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.field).collect()
    }

    /// Human-readable message per violation.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

fn render_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A status change the lifecycle does not permit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move incident from {from} to {to}; allowed: {}", render_allowed(.allowed))]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
    pub allowed: Vec<Status>,
}

fn render_allowed(allowed: &[Status]) -> String {
    if allowed.is_empty() {
        return "none".to_string();
    }
    allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

fn check_min_len(
    field: &'static str,
    value: Option<&str>,
    min: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None => {
            errors.push(FieldError::new(field, None, "is required"));
            None
        }
        Some(text) if text.chars().count() < min => {
            errors.push(FieldError::new(
                field,
                Some(text),
                format!("must be at least {min} characters"),
            ));
            None
        }
        Some(text) => Some(text.to_string()),
    }
}

/// Exact match against the canonical names in `all`; no trimming or case
/// folding.
fn check_enum<T: Copy + fmt::Display>(
    field: &'static str,
    value: Option<&str>,
    all: &[T],
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let expected = all
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let Some(raw) = value else {
        errors.push(FieldError::new(
            field,
            None,
            format!("is required; expected one of {expected}"),
        ));
        return None;
    };
    if let Some(found) = all.iter().copied().find(|c| c.to_string() == raw) {
        Some(found)
    } else {
        errors.push(FieldError::new(
            field,
            Some(raw),
            format!("expected one of {expected}"),
        ));
        None
    }
}

/// Check a create payload and return its four typed fields.
///
/// All rules run; the error lists every violated field.
///
/// # Errors
///
/// Returns [`ValidationErrors`] when any field is missing or malformed.
pub fn validate_create(payload: &CreatePayload) -> Result<NewIncident, ValidationErrors> {
    let mut errors = Vec::new();

    let title = check_min_len("title", payload.title.as_deref(), MIN_TITLE_LEN, &mut errors);
    let description = check_min_len(
        "description",
        payload.description.as_deref(),
        MIN_DESCRIPTION_LEN,
        &mut errors,
    );
    let category = check_enum(
        "category",
        payload.category.as_deref(),
        &Category::ALL,
        &mut errors,
    );
    let severity = check_enum(
        "severity",
        payload.severity.as_deref(),
        &Severity::ALL,
        &mut errors,
    );

    match (title, description, category, severity) {
        (Some(title), Some(description), Some(category), Some(severity)) => {
            Ok(NewIncident {
                title,
                description,
                category,
                severity,
            })
        }
        _ => Err(ValidationErrors(errors)),
    }
}

/// Check that `current -> requested` is a legal status change.
///
/// ARCHIVED is reachable only through an archive edge; every other target
/// must be the next step forward.
///
/// # Errors
///
/// Returns [`InvalidTransition`] naming the current status and the statuses
/// it may advance to instead.
pub fn validate_transition(current: Status, requested: Status) -> Result<Status, InvalidTransition> {
    let action = if requested == Status::Archived {
        Action::Archive
    } else {
        Action::Advance
    };

    if current.apply(action) == Some(requested) {
        return Ok(requested);
    }

    Err(InvalidTransition {
        from: current,
        to: requested,
        allowed: current.targets(Action::Advance),
    })
}
