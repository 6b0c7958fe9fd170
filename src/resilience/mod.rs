//! Resilience subsystem: retry, backoff and poll policy.
//!
//! # Data Flow
//! ```text
//! Fetch failure reported by the data-fetching layer:
//!     → classify.rs (NetworkUnreachable / ServerRejected / Other)
//!     → policy.rs (retry? how long? cancel the poll?)
//!     → backoff.rs (capped exponential delay)
//!
//! Recurring polls:
//!     poller.rs ticks on its interval
//!     → signals.rs focus/online events, filtered by policy
//!     → cancelled as soon as the network is classified unreachable
//! ```
//!
//! # Design Decisions
//! - Never retry when nothing answered; an outage must not become a retry storm
//! - Server rejections get one retry with capped exponential backoff
//! - Focus and reconnect never trigger implicit refetches by default

pub mod backoff;
pub mod classify;
pub mod poller;
pub mod policy;
pub mod signals;

pub use classify::{FailureClass, QueryError};
pub use poller::{PollHandle, PollOutcome, Poller};
pub use policy::{FetchKind, QueryPolicy, RefetchTrigger, RetryDecision};
pub use signals::{ConnectivitySignals, Signal, SignalSource};
