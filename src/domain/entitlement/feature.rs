//! Feature key value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Key identifying a metered feature (e.g. `ai_recommendations`).
///
/// Features are an open, deploy-versioned set defined by the policy
/// catalogue, so this is a validated string rather than a closed enum.
/// Whether a key is actually registered is the catalogue's call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureKey(String);

impl FeatureKey {
    /// Creates a new FeatureKey, returning error if empty or blank.
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::empty_field("feature"));
        }
        Ok(Self(key))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
