//! Severity classification of decibel readings.
//!
//! [`Severity`] is totally ordered by increasing threshold, so
//! `status >= Severity::Warning` is the alert condition.  The lowercase
//! serialisation (`"acceptable"` / `"warning"` / `"violation"`) matches what
//! the storage backend expects in the `status` field of both wire payloads.

use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Classification of a decibel reading against the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// At or below the acceptable threshold.
    Acceptable,
    /// Above acceptable but at or below the warning threshold.
    Warning,
    /// Above the warning threshold.
    Violation,
}

impl Severity {
    /// Classify a decibel value.
    ///
    /// Boundary values belong to the lower severity: with the default
    /// thresholds `{60, 70, 80}`, a reading of exactly 60.0 is `Acceptable`
    /// and 70.0 is `Warning`.
    ///
    /// ```
    /// use noise_monitor::config::ThresholdConfig;
    /// use noise_monitor::pipeline::Severity;
    ///
    /// let t = ThresholdConfig::default();
    /// assert_eq!(Severity::classify(60.0, &t), Severity::Acceptable);
    /// assert_eq!(Severity::classify(61.0, &t), Severity::Warning);
    /// assert_eq!(Severity::classify(81.0, &t), Severity::Violation);
    /// ```
    pub fn classify(decibels: f64, thresholds: &ThresholdConfig) -> Self {
        if decibels <= thresholds.acceptable {
            Severity::Acceptable
        } else if decibels <= thresholds.warning {
            Severity::Warning
        } else {
            Severity::Violation
        }
    }

    /// Returns `true` when the reading should trigger an alert dispatch.
    pub fn is_alertable(&self) -> bool {
        matches!(self, Severity::Warning | Severity::Violation)
    }

    /// Lowercase wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Acceptable => "acceptable",
            Severity::Warning => "warning",
            Severity::Violation => "violation",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn default_thresholds() -> ThresholdConfig {
        ThresholdConfig {
            acceptable: 60.0,
            warning: 70.0,
            violation: 80.0,
        }
    }

    // ---- Ordering invariant at the default thresholds ----------------------

    #[test]
    fn classify_respects_threshold_boundaries() {
        let t = default_thresholds();
        assert_eq!(Severity::classify(59.0, &t), Severity::Acceptable);
        assert_eq!(Severity::classify(60.0, &t), Severity::Acceptable);
        assert_eq!(Severity::classify(61.0, &t), Severity::Warning);
        assert_eq!(Severity::classify(70.0, &t), Severity::Warning);
        assert_eq!(Severity::classify(70.1, &t), Severity::Violation);
        assert_eq!(Severity::classify(81.0, &t), Severity::Violation);
    }

    #[test]
    fn classify_extremes() {
        let t = default_thresholds();
        assert_eq!(Severity::classify(0.0, &t), Severity::Acceptable);
        assert_eq!(Severity::classify(120.0, &t), Severity::Violation);
    }

    #[test]
    fn severity_is_totally_ordered() {
        assert!(Severity::Acceptable < Severity::Warning);
        assert!(Severity::Warning < Severity::Violation);
    }

    #[test]
    fn alertable_severities() {
        assert!(!Severity::Acceptable.is_alertable());
        assert!(Severity::Warning.is_alertable());
        assert!(Severity::Violation.is_alertable());
    }

    // ---- Wire representation ------------------------------------------------

    #[test]
    fn serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Acceptable).unwrap(),
            "\"acceptable\""
        );
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            "\"warning\""
        );
        assert_eq!(
            serde_json::to_string(&Severity::Violation).unwrap(),
            "\"violation\""
        );
    }

    #[test]
    fn as_str_matches_serde() {
        for s in [Severity::Acceptable, Severity::Warning, Severity::Violation] {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.as_str()));
        }
    }
}
