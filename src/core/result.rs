use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::core::CleanupError;

/// Outcome of one executed action. Built once when the action returns and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupResult {
    pub name: String,
    pub success: bool,
    pub space_freed: u64,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CleanupResult {
    pub fn from_outcome(
        name: impl Into<String>,
        outcome: Result<u64, CleanupError>,
        duration: Duration,
    ) -> Self {
        match outcome {
            Ok(space_freed) => Self {
                name: name.into(),
                success: true,
                space_freed,
                duration,
                error: None,
            },
            Err(err) => Self::failed(name, err.to_string(), duration),
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            success: false,
            space_freed: 0,
            duration,
            error: Some(error.into()),
        }
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis().min(u128::from(u64::MAX)) as u64)
}

/// One line of a batch run: either an executed action or one the user (or
/// the environment) declined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunItem {
    Ran(CleanupResult),
    Skipped { name: String, reason: String },
}

impl RunItem {
    pub fn name(&self) -> &str {
        match self {
            RunItem::Ran(r) => &r.name,
            RunItem::Skipped { name, .. } => name,
        }
    }

    pub fn result(&self) -> Option<&CleanupResult> {
        match self {
            RunItem::Ran(r) => Some(r),
            RunItem::Skipped { .. } => None,
        }
    }
}

/// Aggregate view over a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub free_before: u64,
    pub free_after: u64,
    /// Difference of the two baselines, floored at zero.
    pub total_freed: u64,
    /// Sum of the per-item measurements.
    pub items_freed: u64,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn new(results: &[CleanupResult], free_before: u64, free_after: u64) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let items_freed = results
            .iter()
            .filter(|r| r.success)
            .fold(0u64, |acc, r| acc.saturating_add(r.space_freed));
        Self {
            free_before,
            free_after,
            total_freed: free_before.saturating_sub(free_after),
            items_freed,
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_reports_zero_bytes() {
        let r = CleanupResult::from_outcome(
            "ghost",
            Err(CleanupError::UnknownType("ghost".to_string())),
            Duration::from_millis(3),
        );
        assert!(!r.success);
        assert_eq!(r.space_freed, 0);
        assert_eq!(r.error.as_deref(), Some("unknown cleanup type: ghost"));
    }

    #[test]
    fn summary_counts_and_floors() {
        let results = vec![
            CleanupResult::from_outcome("a", Ok(100), Duration::ZERO),
            CleanupResult::from_outcome("b", Ok(0), Duration::ZERO),
            CleanupResult::failed("c", "boom", Duration::ZERO),
        ];
        let s = RunSummary::new(&results, 1000, 900);
        assert_eq!(s.total_freed, 100);
        assert_eq!(s.items_freed, 100);
        assert_eq!(s.succeeded, 2);
        assert_eq!(s.failed, 1);
        assert_eq!(s.total(), 3);

        let grew = RunSummary::new(&results, 1000, 1500);
        assert_eq!(grew.total_freed, 0);
    }

    #[test]
    fn result_serializes_duration_as_millis() {
        let r = CleanupResult::from_outcome("a", Ok(5), Duration::from_millis(1500));
        let v = serde_json::to_value(&r).expect("serialize");
        assert_eq!(v["duration_ms"], 1500);
        assert_eq!(v["space_freed"], 5);
        assert!(v.get("error").is_none());
    }
}
