//! Clinical Registry Core Library
//!
//! Patients, their visits, and role-gated access to registry operations,
//! backed by flat delimited files.
//!
//! # Architecture
//!
//! ```text
//!   credentials file ──► auth::authorize ──► Role
//!                                              │
//!   registry file ──► codec::load_registry ──► Session ◄── presentation layer
//!         ▲                                    │
//!         │                     ┌──────────────┼──────────────┐
//!         │                     ▼              ▼              ▼
//!         │                 Registry        stats         role table
//!         │               (mutations)   (read-only)
//!         │                     │
//!         └── codec::save_registry (full rewrite after every mutation)
//! ```
//!
//! # Modules
//!
//! - [`models`]: Patient, Visit, Note, Role and field validation
//! - [`registry`]: In-memory repository and visit id generation
//! - [`codec`]: Registry file decode/encode
//! - [`stats`]: Aggregation queries and the key statistics report
//! - [`auth`]: Credential store and role → operation table
//! - [`config`]: File locations and decode policy
//! - [`session`]: Per-login context the presentation layer drives

pub mod auth;
pub mod codec;
pub mod config;
pub mod models;
pub mod registry;
pub mod session;
pub mod stats;

// Re-export commonly used types
pub use auth::{authorize, AuthOutcome, CredentialStore, Operation};
pub use codec::{decode, encode, load_registry, save_registry, InvalidRowPolicy};
pub use config::RegistryConfig;
pub use models::{DemographicAttribute, Demographics, NewVisit, Note, Patient, Role, Visit};
pub use registry::{RandomVisitIds, Registry, VisitIdGenerator};
pub use session::{LoginOutcome, Registration, Session, SessionError};
pub use stats::KeyStatistics;
