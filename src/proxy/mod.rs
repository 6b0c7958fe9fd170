//! Interception proxy: cache-first request handling with offline fallback.
//!
//! # Data Flow
//! ```text
//! InterceptedRequest
//!     → admission.rs (GET? same origin? dev tooling?)
//!         ineligible → Network → Passthrough
//!     → CacheStore::lookup (active generation)
//!         hit → Cache
//!     → Network
//!         2xx → stored in active generation → Network
//!         unreachable + Navigate → cached root document → Fallback
//!         unreachable otherwise → FetchError
//! ```
//!
//! # Design Decisions
//! - Rollover fills the new generation off to the side and flips `active`
//!   only when every manifest asset succeeded
//! - Error statuses are answered but never cached
//! - Admission rules live behind `ArcSwap` so hot reload never blocks requests

pub mod admission;
pub mod error;
pub mod interceptor;
pub mod network;
pub mod request;

pub use admission::{AdmissionFilter, Rejection};
pub use error::{ActivationError, FetchError};
pub use interceptor::InterceptionProxy;
pub use network::Network;
pub use request::{InterceptedRequest, ProxyResponse, RequestMode, ResponseSource};
