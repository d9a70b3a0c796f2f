//! Offline-limitations reporter

use crate::actions::{ActionLog, UploadQueue};
use crate::db::schema;
use crate::models::{ComplexOperation, OfflineLimitations};

/// Categories of functionality known to degrade while offline.
///
/// Fixed operational documentation surfaced to the UI; not derived from
/// runtime state.
const COMPLEX_OPERATIONS: [ComplexOperation; 3] = [
    ComplexOperation {
        name: "Advanced Reporting",
        description: "Complex reports and analytics require server-side processing",
        status: "limited",
    },
    ComplexOperation {
        name: "Real-time Collaboration",
        description: "Multi-user editing and real-time updates are not available offline",
        status: "unavailable",
    },
    ComplexOperation {
        name: "Data Validation",
        description: "Some complex validation rules may be simplified in offline mode",
        status: "limited",
    },
];

/// Aggregate what is pending or degraded right now.
///
/// Read-only; an individual collection failing to answer degrades to a
/// zero-count for that category rather than failing the whole aggregation.
pub async fn offline_limitations(log: &ActionLog, uploads: &UploadQueue) -> OfflineLimitations {
    let mut pending_uploads = 0;
    for collection in schema::UPLOAD_COLLECTIONS {
        pending_uploads += uploads.pending_count(collection).await.unwrap_or(0);
    }

    let pending_actions = log.pending().await.map_or(0, |actions| actions.len());

    OfflineLimitations {
        pending_uploads,
        pending_actions,
        complex_operations: COMPLEX_OPERATIONS.to_vec(),
    }
}
