//! Audit sink interface for ban lifecycle events.

use crate::error::AuditError;
use crate::record::{AuditEvent, BanRecord, CreatorId};

/// Receives ban lifecycle notifications.
///
/// Sinks are observers: the registry calls them after its locks are
/// released, and a failing sink is logged but never fails the operation.
pub trait AuditSink: Send + Sync {
    /// Record that `event` happened to `record`, performed by `actor`.
    fn notify(
        &self,
        event: AuditEvent,
        record: &BanRecord,
        actor: CreatorId,
    ) -> Result<(), AuditError>;
}

/// Writes moderation-style log lines through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn notify(
        &self,
        event: AuditEvent,
        record: &BanRecord,
        actor: CreatorId,
    ) -> Result<(), AuditError> {
        log::info!(
            target: "ipban::audit",
            "[{}] {} by {} ({})",
            event,
            record.describe(event),
            actor,
            record.id
        );
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn notify(&self, _: AuditEvent, _: &BanRecord, _: CreatorId) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::BanId;
    use crate::{AddressSpec, Category};
    use std::time::SystemTime;

    #[test]
    fn test_builtin_sinks_accept_events() {
        let record = BanRecord::new(
            BanId(1),
            AddressSpec::parse("198.51.100.0/24").unwrap(),
            Category::Partial,
            CreatorId(1),
            "abuse",
            SystemTime::now(),
        );
        let sinks: [&dyn AuditSink; 2] = [&LogAuditSink, &NullAuditSink];
        for sink in sinks {
            for event in [AuditEvent::Created, AuditEvent::Deleted, AuditEvent::Undeleted] {
                assert!(sink.notify(event, &record, CreatorId(2)).is_ok());
            }
        }
    }
}
