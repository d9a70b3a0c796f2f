//! Deferred-mutation bookkeeping: action log and upload queue

mod log;
mod uploads;

pub use log::ActionLog;
pub use uploads::UploadQueue;
