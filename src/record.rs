//! Ban records and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::address::AddressSpec;
use crate::Category;

/// Unique, immutable ban identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BanId(pub u64);

impl fmt::Display for BanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to the principal acting on a ban.
///
/// Authorization happens elsewhere; the registry only records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatorId(pub u64);

impl fmt::Display for CreatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user #{}", self.0)
    }
}

/// Lifecycle events reported to the audit sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Created,
    Deleted,
    Undeleted,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::Created => "ip_ban_create",
            AuditEvent::Deleted => "ip_ban_delete",
            AuditEvent::Undeleted => "ip_ban_undelete",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ban.
///
/// Records are soft-deleted, never removed. Only active records
/// (`is_deleted == false`) take part in matching and overlap checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    pub id: BanId,
    pub subnet: AddressSpec,
    pub category: Category,
    pub creator_id: CreatorId,
    pub reason: String,
    pub is_deleted: bool,
    pub hit_count: u64,
    pub last_hit_at: Option<SystemTime>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl BanRecord {
    /// Build a fresh, active record. Validation is the caller's job.
    pub fn new(
        id: BanId,
        subnet: AddressSpec,
        category: Category,
        creator_id: CreatorId,
        reason: impl Into<String>,
        now: SystemTime,
    ) -> Self {
        Self {
            id,
            subnet,
            category,
            creator_id,
            reason: reason.into(),
            is_deleted: false,
            hit_count: 0,
            last_hit_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record participates in matching.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Move to the given deleted state.
    ///
    /// Returns the event to report, or `None` when the record is already
    /// in that state (nothing changes, not even `updated_at`).
    pub fn set_deleted(&mut self, deleted: bool, now: SystemTime) -> Option<AuditEvent> {
        if self.is_deleted == deleted {
            return None;
        }
        self.is_deleted = deleted;
        self.updated_at = now;
        Some(if deleted {
            AuditEvent::Deleted
        } else {
            AuditEvent::Undeleted
        })
    }

    /// Count one match. Touches only `last_hit_at`.
    pub fn register_hit(&mut self, now: SystemTime) {
        self.hit_count = self.hit_count.saturating_add(1);
        self.last_hit_at = Some(now);
    }

    /// Moderation log line for an event on this record.
    pub fn describe(&self, event: AuditEvent) -> String {
        let verb = match event {
            AuditEvent::Created => "created",
            AuditEvent::Deleted => "deleted",
            AuditEvent::Undeleted => "undeleted",
        };
        format!("{} {} ip ban for {}", verb, self.category, self.subnet)
    }
}
