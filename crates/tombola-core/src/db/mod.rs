//! Local persistence layer

mod connection;
mod migrations;
pub mod schema;
mod store;

pub use connection::Database;
pub use store::LocalStore;
