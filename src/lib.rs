#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Turnstile
//!
//! In-process request admission control. Each request is screened in two
//! independent stages: a stateless signature scan of the client's declared
//! identification string, then a sliding-window rate count for the client's
//! key. Either stage can block; neither suspends, performs I/O, or fails.
//!
//! ## Features
//!
//! - **Signature screening** against a fixed list of automation tokens
//! - **Sliding-window velocity tracking** with atomic per-key counting
//! - **Background reaper** with an explicit start/stop lifecycle
//! - **Tower middleware** for wiring admission into a service stack
//! - **Injectable clock** for deterministic tests
//!
//! ## Quick Start
//!
//! ```rust
//! use turnstile::{AdmissionPolicy, Verdict};
//!
//! let policy = AdmissionPolicy::new();
//!
//! // Automation tooling is blocked on signature alone.
//! assert!(policy.classify("203.0.113.5", Some("curl/7.68.0")).is_blocked());
//!
//! // So is a request that declares nothing.
//! assert!(policy.classify("203.0.113.5", None).is_blocked());
//!
//! // A benign browser signal passes until the key exceeds its rate budget.
//! let verdict = policy.classify("203.0.113.5", Some("Mozilla/5.0 (X11; Linux x86_64)"));
//! assert_eq!(verdict, Verdict::Allowed);
//! ```
//!
//! Idle keys are reclaimed by a [`Reaper`] running on its own tokio task:
//!
//! ```rust
//! use turnstile::{AdmissionPolicy, Reaper};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let policy = AdmissionPolicy::new();
//!     let reaper = Reaper::new(&policy);
//!     reaper.start();
//!     // ... serve traffic through `policy` ...
//!     reaper.stop().await;
//! }
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod reaper;
pub mod signature;
pub mod velocity;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use engine::{AdmissionPolicy, BlockReason, Verdict, VELOCITY_THRESHOLD};
pub use error::AdmissionError;
pub use middleware::{resolve_client_key, AdmissionLayer, AdmissionService, ClientIdentity};
pub use reaper::{Reaper, SWEEP_INTERVAL_MS};
pub use signature::{is_suspicious_signal, SIGNATURE_TOKENS};
pub use velocity::{VelocityStore, IDLE_THRESHOLD_MS, WINDOW_MS};
