//! Composite identifiers.
//!
//! A managed entity is persisted under a single string id built from several
//! key parts joined by [`ID_DELIMITER`], e.g. `"proj-1:42"` for a variable
//! living in project `proj-1`. The format is durable: it is written to the
//! caller's state storage and parsed again on every read/update/delete.
//!
//! Parts are never escaped. Decoding splits at most `arity - 1` times, so only
//! the last part may itself contain the delimiter and still round-trip.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator between the parts of a composite identifier.
pub const ID_DELIMITER: char = ':';

/// Smallest number of parts a composite identifier can have.
pub const MIN_ARITY: usize = 2;

/// Errors produced while building or parsing composite identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("composite identifiers need at least {MIN_ARITY} parts, got arity {arity}")]
    InvalidArity { arity: usize },

    #[error("{subject} identifier takes {expected} parts, got {found}")]
    ArityMismatch {
        subject: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid {subject} identifier {value:?}: expected {expected}")]
    Format {
        subject: String,
        value: String,
        expected: String,
    },
}

const GENERIC_SUBJECT: &str = "composite";

fn check_arity(arity: usize) -> Result<(), IdError> {
    if arity < MIN_ARITY {
        return Err(IdError::InvalidArity { arity });
    }
    Ok(())
}

/// Joins `parts` into a composite identifier.
///
/// Fails when `parts.len() != arity`. Parts are not checked for the
/// delimiter; a delimiter in any part but the last will not decode back.
pub fn encode<S: AsRef<str>>(parts: &[S], arity: usize) -> Result<String, IdError> {
    check_arity(arity)?;
    if parts.len() != arity {
        return Err(IdError::ArityMismatch {
            subject: GENERIC_SUBJECT.to_string(),
            expected: arity,
            found: parts.len(),
        });
    }
    Ok(join(parts))
}

/// Splits a composite identifier into exactly `arity` parts.
pub fn decode(id: &str, arity: usize) -> Result<Vec<String>, IdError> {
    check_arity(arity)?;
    split(id, arity).ok_or_else(|| IdError::Format {
        subject: GENERIC_SUBJECT.to_string(),
        value: id.to_string(),
        expected: format!("{arity} parts separated by '{ID_DELIMITER}'"),
    })
}

fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(ID_DELIMITER);
        }
        out.push_str(part.as_ref());
    }
    out
}

fn split(id: &str, arity: usize) -> Option<Vec<String>> {
    let parts: Vec<String> = id.splitn(arity, ID_DELIMITER).map(str::to_string).collect();
    (parts.len() == arity).then_some(parts)
}

/// A decoded composite identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeId(Vec<String>);

impl CompositeId {
    /// Builds an identifier from its parts (at least two).
    pub fn new<I, S>(parts: I) -> Result<Self, IdError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        check_arity(parts.len())?;
        Ok(Self(parts))
    }

    /// Parses an identifier of a known arity.
    pub fn parse(id: &str, arity: usize) -> Result<Self, IdError> {
        decode(id, arity).map(Self)
    }

    /// Number of parts.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Returns the part at `index`.
    #[must_use]
    pub fn part(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_parts(self) -> Vec<String> {
        self.0
    }

    /// The persisted string form.
    #[must_use]
    pub fn encoded(&self) -> String {
        join(&self.0)
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded())
    }
}

/// The identifier layout of one resource type.
///
/// Carries the resource type name and a label per part so that parse errors
/// say which entity failed and what shape was expected, e.g.
/// `invalid gitlab_project_variable identifier "7": expected <project>:<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdFormat {
    resource_type: String,
    labels: Vec<String>,
}

impl IdFormat {
    pub fn new<I, S>(resource_type: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_type: resource_type.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Human-readable layout, e.g. `<group>:<provider>:<cn>:<filter>`.
    #[must_use]
    pub fn template(&self) -> String {
        let labels: Vec<String> = self.labels.iter().map(|l| format!("<{l}>")).collect();
        join(&labels)
    }

    pub fn encode<S: AsRef<str>>(&self, parts: &[S]) -> Result<String, IdError> {
        check_arity(self.arity())?;
        if parts.len() != self.arity() {
            return Err(IdError::ArityMismatch {
                subject: self.resource_type.clone(),
                expected: self.arity(),
                found: parts.len(),
            });
        }
        Ok(join(parts))
    }

    pub fn decode(&self, id: &str) -> Result<CompositeId, IdError> {
        check_arity(self.arity())?;
        split(id, self.arity())
            .map(CompositeId)
            .ok_or_else(|| IdError::Format {
                subject: self.resource_type.clone(),
                value: id.to_string(),
                expected: self.template(),
            })
    }
}
