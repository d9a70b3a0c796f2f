//! Background synchronization: action replay and offline-limitations report

mod engine;
mod limitations;

pub use engine::SyncEngine;
pub use limitations::offline_limitations;
