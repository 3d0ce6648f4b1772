// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tyria Fetch
//!
//! Credential-aware access to the Guild Wars 2 API.
//!
//! ## Request path
//!
//! - [`credential`] - The session API key, its codec and where it is persisted
//! - [`host`] - Keychain persistence and the network transport
//! - [`middleware`] - Request stages, error classification, response observers
//! - [`http::HttpClient`] - One shared client running the middleware pipeline
//!
//! ## Item lookups
//!
//! - [`batch::BatchFetcher`] - Deduplicates ids and fetches them in chunks
//! - [`cache::EntityCache`] - Items by id, including ids known to be missing
//! - [`inflight::InFlightRegistry`] - Joins concurrent lookups of the same ids
//! - [`service::ItemDetailsService`] - Cache-first lookup in input order
//!
//! ## Wiring
//!
//! [`session::Session`] builds one instance of everything above plus the
//! typed endpoints of [`api::ApiClient`].
//!
//! ```ignore
//! use tyria_fetch::Session;
//!
//! let session = Session::builder().chunk_size(200).build()?;
//! session.restore_credential().await;
//!
//! let bank = session.api.get_bank().await?;
//! let items = session.details.fetch_details(&bank.item_ids()).await;
//! ```

// Core modules
pub mod api;
pub mod batch;
pub mod cache;
pub mod credential;
pub mod error;
pub mod host;
pub mod http;
pub mod inflight;
pub mod middleware;
pub mod service;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types at crate root

// Errors
pub use error::{CredentialError, FetchError, TransportError};

// Credential
pub use credential::{
    Base64Codec, Credential, CredentialBackend, CredentialCodec, CredentialEncoding,
    CredentialStore, MemoryBackend, PlainCodec,
};

// Host APIs
pub use host::{KeychainBackend, ReqwestTransport, Transport, TransportRequest, TransportResponse};

// HTTP pipeline
pub use http::{ApiBase, ApiRequest, HttpClient, HttpClientBuilder};
pub use middleware::{AuthStrategy, RequestMiddleware, ResponseObserver, classify};

// Items
pub use batch::{BatchFetcher, BatchOutcome, BatchPlan, ChunkFailure, DEFAULT_CHUNK_SIZE};
pub use cache::{CacheEntry, EntityCache};
pub use inflight::InFlightRegistry;
pub use service::ItemDetailsService;

// Endpoints & wiring
pub use api::ApiClient;
pub use session::{Session, SessionBuilder, SessionSettings};
