//! Network seams: connectivity signal, session credential, REST transport

mod backend;
mod connectivity;
mod http;
mod session;

pub use backend::RemoteBackend;
pub use connectivity::{Connectivity, NetworkState};
pub use http::HttpBackend;
pub use session::SessionStore;
