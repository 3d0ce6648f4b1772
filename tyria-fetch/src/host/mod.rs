//! Host APIs used by the fetch pipeline.
//!
//! - [`keychain`] - Credential persistence in the system keychain
//! - [`transport`] - The network transport behind the HTTP client

pub mod keychain;
pub mod transport;

// Re-export key types
pub use keychain::KeychainBackend;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
