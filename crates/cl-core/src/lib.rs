//! CopyLift Core Library
//!
//! This crate provides the restriction-lifting engine for the CopyLift
//! extension: per-site configuration, one-shot restriction detection,
//! and the interaction restorer that keeps a page copyable while it
//! fights back.
//!
//! # Architecture
//!
//! The engine is pure: every DOM side effect goes through the
//! [`restorer::DomHost`] trait and every page reading through
//! [`detect::PageProbe`], so the whole state machine is unit-testable
//! natively. The `cl-wasm` crate implements both on the real document.
//!
//! # Modules
//!
//! - `config`: site configuration store with legacy-format normalization
//! - `detect`: cached one-shot restriction scan
//! - `restorer`: capturing listeners, override stylesheet, mutation
//!   resilience, exact teardown
//! - `heuristic`: session-scoped right-click-navigation detection
//! - `protocol`: popup/background message types
//! - `url`: hostname extraction for page URLs
//! - `retry`: bounded retry budget for DOM-readiness waits
//! - `types`: shared type definitions

pub mod config;
pub mod detect;
pub mod heuristic;
pub mod protocol;
pub mod restorer;
pub mod retry;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use config::{normalize, ConfigBackend, SiteConfig, SiteStore, StoredEntry};
pub use detect::{Detector, PageProbe};
pub use heuristic::{NavTrapHeuristic, SessionFlag};
pub use protocol::{Request, Response};
pub use restorer::{DomHost, Disposition, Restorer};
pub use types::{DetectionSnapshot, FeatureSet, ListenerKind, MouseButton};
pub use url::page_hostname;
