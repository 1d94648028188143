// jenkinsfly-api: Async Rust client for the Jenkins remote access API

pub mod client;
pub mod error;
pub mod transport;
pub mod version;

pub use client::{JenkinsClient, ServerInfo};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use version::JenkinsVersion;
