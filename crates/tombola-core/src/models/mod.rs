//! Data models for the offline sync layer

mod action;
mod payload;
mod record;
mod report;
mod upload;

pub use action::{ActionDraft, ActionKind, OfflineAction, SYNCED_DONE, SYNCED_PENDING};
pub use payload::{FilePart, MultipartPayload, Payload};
pub use record::{
    new_local_id, parse_timestamp, Record, ID_FIELD, LOCAL_ID_PREFIX, LOCAL_ONLY_FLAG,
    PENDING_UPLOAD_FLAG, UPDATED_AT_FIELD,
};
pub use report::{ComplexOperation, OfflineLimitations, SyncReport};
pub use upload::{FileEntry, PendingUpload, UploadStatus};
