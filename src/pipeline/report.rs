//! Outcome of one ingestion run.

use serde::Serialize;
use uuid::Uuid;

/// A video that could not be turned into a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedVideo {
    pub video_id: String,
    pub reason: String,
}

/// Disjoint sets of video IDs, one per outcome.
///
/// Order within each set follows completion, not input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Recipes written by this run.
    pub succeeded: Vec<String>,
    /// Already stored before the run, or stored concurrently by another run.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedVideo>,
    /// Admitted but never started because the run was cancelled.
    pub cancelled: Vec<String>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    /// Number of distinct videos the report accounts for.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len() + self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Whether the ID was stored by this run.
    pub fn stored(&self, video_id: &str) -> bool {
        self.succeeded.iter().any(|id| id == video_id)
    }

    pub fn failure_for(&self, video_id: &str) -> Option<&FailedVideo> {
        self.failed.iter().find(|f| f.video_id == video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = RunReport::new(Uuid::new_v4());
        assert!(report.is_empty());

        report.succeeded.push("a".to_string());
        report.skipped.push("b".to_string());
        report.failed.push(FailedVideo {
            video_id: "c".to_string(),
            reason: "media failed: private video".to_string(),
        });

        assert_eq!(report.total(), 3);
        assert!(report.stored("a"));
        assert!(!report.stored("b"));
        assert_eq!(report.failure_for("c").unwrap().reason, "media failed: private video");
    }
}
