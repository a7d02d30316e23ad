//! Validation of client-supplied task input.
//!
//! Request bodies are inspected as raw JSON so that every problem can be
//! reported per field (unknown enum values, wrong types, malformed dates)
//! instead of failing on the first deserialization error. Unknown keys are
//! ignored, which is also how server-maintained fields such as `isCompleted`
//! or `createdAt` stay out of the client's reach.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::task::{MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH, Priority, TaskStatus};

const TITLE_MESSAGE: &str = "Title must be between 1 and 100 characters";
const DESCRIPTION_MESSAGE: &str = "Description cannot exceed 500 characters";
const STATUS_MESSAGE: &str = "Invalid status";
const PRIORITY_MESSAGE: &str = "Invalid priority";
const DUE_DATE_MESSAGE: &str = "Invalid date format";
const TAGS_MESSAGE: &str = "Tags must be an array";

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// JSON name of the offending field (`body` for the payload as a whole).
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Input was rejected; carries every field-level problem found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Validation failed")]
pub struct ValidationError {
    /// Problems, in field order.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// A validation error with a single problem.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Whether `field` is among the rejected fields.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Validated input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Trimmed, 1..=100 characters.
    pub title: String,
    /// Trimmed, at most 500 characters.
    pub description: String,
    /// Initial status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
    /// Trimmed labels; blank labels are dropped.
    pub tags: Vec<String>,
}

impl NewTask {
    /// A task with the given title and every other field at its default.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: Priority::default(),
            due_date: None,
            tags: Vec::new(),
        }
    }

    /// Validates a creation payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every rejected field. `title` is
    /// required; all other fields are optional.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(body)?;
        let title = reader.required("title", parse_title, TITLE_MESSAGE);
        let description = reader.optional("description", parse_description);
        let status = reader.optional("status", parse_status);
        let priority = reader.optional("priority", parse_priority);
        let due_date = reader.optional("dueDate", parse_due_date);
        let tags = reader.optional("tags", parse_tags);
        reader.finish()?;

        Ok(Self {
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            status: status.unwrap_or_default(),
            priority: priority.unwrap_or_default(),
            due_date: due_date.flatten(),
            tags: tags.unwrap_or_default(),
        })
    }
}

/// Validated partial update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// `Some(None)` clears the deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    /// Replacement label list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    /// A patch that only changes the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
    }

    /// Validates an update payload. Every field is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every rejected field.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(body)?;
        let patch = Self {
            title: reader.optional("title", parse_title),
            description: reader.optional("description", parse_description),
            status: reader.optional("status", parse_status),
            priority: reader.optional("priority", parse_priority),
            due_date: reader.optional("dueDate", parse_due_date),
            tags: reader.optional("tags", parse_tags),
        };
        reader.finish()?;
        Ok(patch)
    }

    /// Validates a status-only payload (`{"status": ...}`), where `status`
    /// is required.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `status` is missing or unrecognized.
    pub fn status_from_json(body: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(body)?;
        let status = reader.required("status", parse_status, STATUS_MESSAGE);
        reader.finish()?;
        Ok(Self {
            status,
            ..Self::default()
        })
    }
}

/// Parses a due date: `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
#[must_use]
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Collects field errors while reading a JSON object.
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(body: &'a Value) -> Result<Self, ValidationError> {
        body.as_object()
            .map(|object| Self {
                object,
                errors: Vec::new(),
            })
            .ok_or_else(|| ValidationError::single("body", "Request body must be a JSON object"))
    }

    fn optional<T>(
        &mut self,
        field: &str,
        parse: fn(&Value) -> Result<T, &'static str>,
    ) -> Option<T> {
        let value = self.object.get(field)?;
        match parse(value) {
            Ok(parsed) => Some(parsed),
            Err(message) => {
                self.errors.push(FieldError::new(field, message));
                None
            }
        }
    }

    fn required<T>(
        &mut self,
        field: &str,
        parse: fn(&Value) -> Result<T, &'static str>,
        missing: &'static str,
    ) -> Option<T> {
        if !self.object.contains_key(field) {
            self.errors.push(FieldError::new(field, missing));
            return None;
        }
        self.optional(field, parse)
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }
}

fn parse_title(value: &Value) -> Result<String, &'static str> {
    let title = value.as_str().ok_or(TITLE_MESSAGE)?.trim();
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LENGTH {
        return Err(TITLE_MESSAGE);
    }
    Ok(title.to_string())
}

fn parse_description(value: &Value) -> Result<String, &'static str> {
    let description = match value {
        Value::Null => return Ok(String::new()),
        Value::String(s) => s.trim(),
        _ => return Err("Description must be a string"),
    };
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(DESCRIPTION_MESSAGE);
    }
    Ok(description.to_string())
}

fn parse_status(value: &Value) -> Result<TaskStatus, &'static str> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or(STATUS_MESSAGE)
}

fn parse_priority(value: &Value) -> Result<Priority, &'static str> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or(PRIORITY_MESSAGE)
}

fn parse_due_date(value: &Value) -> Result<Option<DateTime<Utc>>, &'static str> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => parse_date(s).map(Some).ok_or(DUE_DATE_MESSAGE),
        _ => Err(DUE_DATE_MESSAGE),
    }
}

fn parse_tags(value: &Value) -> Result<Vec<String>, &'static str> {
    let items = value.as_array().ok_or(TAGS_MESSAGE)?;
    items
        .iter()
        .map(|item| item.as_str().ok_or("Tags must be strings"))
        .filter_map(|tag| match tag {
            Ok(tag) if tag.trim().is_empty() => None,
            Ok(tag) => Some(Ok(tag.trim().to_string())),
            Err(e) => Some(Err(e)),
        })
        .collect()
}
