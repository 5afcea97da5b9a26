//! Session configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Count single-parent navigations and warn about N+1 patterns.
    pub n1_detection: bool,
    /// Navigations of one relationship before the N+1 warning fires.
    pub n1_threshold: usize,
    /// Append the related model's primary key to every relationship ordering.
    pub tie_break_on_pk: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n1_detection: true,
            n1_threshold: 3,
            tie_break_on_pk: true,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable N+1 detection.
    #[must_use]
    pub fn n1_detection(mut self, value: bool) -> Self {
        self.n1_detection = value;
        self
    }

    /// Set the N+1 warning threshold.
    #[must_use]
    pub fn n1_threshold(mut self, threshold: usize) -> Self {
        self.n1_threshold = threshold;
        self
    }

    /// Enable or disable primary-key tie breaking in relationship orderings.
    #[must_use]
    pub fn tie_break_on_pk(mut self, value: bool) -> Self {
        self.tie_break_on_pk = value;
        self
    }
}
