//! Sync pass and offline-limitation reports

use serde::Serialize;

/// Aggregate result of one sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SyncReport {
    /// Actions replayed successfully
    pub success: u32,
    /// Actions that failed and remain pending
    pub failed: u32,
    /// Conflicts detected (resolved last-write-wins, never counted as failed)
    pub conflicts: u32,
    /// File uploads completed
    pub file_uploads: u32,
    /// Human-readable summary
    pub message: String,
}

impl SyncReport {
    /// Zeroed report for passes that did not run (offline, already in flight)
    #[must_use]
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Build a report with the summary message reflecting whichever counts
    /// are non-zero
    #[must_use]
    pub fn summarize(success: u32, failed: u32, conflicts: u32, file_uploads: u32) -> Self {
        let mut message = format!("Sync complete! {success} items synchronized.");
        if file_uploads > 0 {
            message = format!(
                "Sync complete! {success} items synchronized, including {file_uploads} file uploads."
            );
        }
        if conflicts > 0 {
            message = format!(
                "Sync complete with {conflicts} conflicts resolved using last-write-wins strategy."
            );
        }

        Self {
            success,
            failed,
            conflicts,
            file_uploads,
            message,
        }
    }
}

/// A category of functionality known to degrade while offline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexOperation {
    pub name: &'static str,
    pub description: &'static str,
    pub status: &'static str,
}

/// Answer to "what is pending / degraded right now"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineLimitations {
    /// Queued uploads still awaiting transmission, across all upload
    /// collections
    pub pending_uploads: usize,
    /// Action-log entries still awaiting replay
    pub pending_actions: usize,
    /// Fixed operational documentation, not derived from runtime state
    pub complex_operations: Vec<ComplexOperation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_plain() {
        let report = SyncReport::summarize(3, 0, 0, 0);
        assert_eq!(report.message, "Sync complete! 3 items synchronized.");
    }

    #[test]
    fn test_message_mentions_file_uploads() {
        let report = SyncReport::summarize(4, 0, 0, 2);
        assert_eq!(
            report.message,
            "Sync complete! 4 items synchronized, including 2 file uploads."
        );
    }

    #[test]
    fn test_message_conflicts_take_precedence() {
        let report = SyncReport::summarize(5, 1, 2, 1);
        assert_eq!(
            report.message,
            "Sync complete with 2 conflicts resolved using last-write-wins strategy."
        );
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_skipped_is_zeroed() {
        let report = SyncReport::skipped("Cannot sync while offline");
        assert_eq!(report.success, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.message, "Cannot sync while offline");
    }
}
