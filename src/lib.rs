//! ipban - A CIDR-based IP ban registry.
//!
//! This crate keeps a registry of banned IPv4/IPv6 addresses and subnets
//! and answers, for any incoming address, whether it is banned under a
//! given ban category.
//!
//! # Features
//!
//! - **Two ban strengths**: `Full` (hard block) and `Partial` (restricted)
//! - **Blast-radius policy**: per-category limits on how broad a subnet may be
//! - **Public addresses only**: private, loopback and link-local ranges are refused
//! - **No redundant bans**: a new ban may not overlap an active one of its category
//! - **Hit statistics**: every match can be counted, safely under concurrency
//! - **Soft delete**: bans are deleted and restored, never removed
//! - **Thread-safe**: all operations are thread-safe
//!
//! # Quick Start
//!
//! ```
//! use ipban::{AddressSpec, BanRegistry, Category, CreatorId, RejectionReason};
//!
//! let registry = BanRegistry::in_memory();
//!
//! let ban = registry
//!     .create_from_str("203.0.113.0/24", Category::Full, CreatorId(1), "spam ring")
//!     .unwrap();
//!
//! // Redundant bans are refused
//! let err = registry
//!     .create_from_str("203.0.113.5", Category::Full, CreatorId(1), "again")
//!     .unwrap_err();
//! assert_eq!(err.rejection(), Some(RejectionReason::AlreadyBanned));
//!
//! // Match and count
//! let addr: AddressSpec = "203.0.113.5".parse().unwrap();
//! assert!(registry.hit(&addr, Category::Full));
//! assert_eq!(registry.get(ban.id).unwrap().hit_count, 1);
//! ```
//!
//! # Policy
//!
//! | category | IPv4 | IPv6 |
//! |----------|------|------|
//! | Full     | /24  | /48  |
//! | Partial  | /8   | /20  |
//!
//! Rules are checked in order: address present, public, narrow enough,
//! not already banned.
//!
//! # Matching
//!
//! When several active bans of a category contain an address, the most
//! specific one (longest prefix) wins; equal prefixes go to the lowest id.

mod address;
mod audit;
mod cache;
mod category;
mod error;
mod hit;
mod policy;
mod record;

pub mod registry;
pub mod store;

// Re-export core types
pub use address::{AddressSpec, Family};
pub use category::Category;
pub use error::{AuditError, Error, ParseError, Result, StoreError};
pub use policy::{PolicyEngine, RejectionReason, Validation};
pub use record::{AuditEvent, BanId, BanRecord, CreatorId};

// Re-export registry types
pub use registry::{BanOrder, BanQuery, BanRegistry, ImportReport, RegistryConfig};

// Re-export collaborators
pub use audit::{AuditSink, LogAuditSink, NullAuditSink};
pub use cache::{BanLookup, CacheStats, CheckCache};
pub use hit::HitTracker;
pub use store::{BanStore, JsonFileStore, MemoryStore};
