use common_enums::{ActivityAction, RecoveryEmailTemplate};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// Email audit tag on an activity entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EmailAudit {
    pub template: RecoveryEmailTemplate,
    pub recipient: String,
}

/// One entry in the append-only per-order/per-decline activity trail.
/// Entries are never mutated after being written.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub entry_id: String,
    /// Order ref or decline id the entry belongs to.
    pub parent_ref: String,
    pub at: PrimitiveDateTime,
    pub action: ActivityAction,
    pub details: String,
    pub email: Option<EmailAudit>,
}

impl ActivityLogEntry {
    pub fn new(
        parent_ref: impl Into<String>,
        action: ActivityAction,
        details: impl Into<String>,
        at: PrimitiveDateTime,
    ) -> Self {
        Self {
            entry_id: common_utils::generate_id_with_default_len("evt"),
            parent_ref: parent_ref.into(),
            at,
            action,
            details: details.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, template: RecoveryEmailTemplate, recipient: impl Into<String>) -> Self {
        self.email = Some(EmailAudit {
            template,
            recipient: recipient.into(),
        });
        self
    }
}
