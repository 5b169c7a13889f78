//! Mail items as seen through the inbox listing.

use chrono::{DateTime, FixedOffset};

use super::attachment::Attachment;

/// Opaque server-side identifier of a mail item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId {
    /// Item identifier.
    pub id: String,
    /// Version stamp sent back with follow-up requests (may be empty).
    pub change_key: String,
}

impl ItemId {
    /// An id without a change key.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: String::new(),
        }
    }
}

/// A received message in the inbox. Never modified by this crate.
#[derive(Debug, Clone)]
pub struct MailItem {
    /// Server-side identifier.
    pub id: ItemId,

    /// When the message was received, in the offset the server reported.
    pub received: DateTime<FixedOffset>,

    /// Attachments in server order. Payloads are fetched on demand.
    pub attachments: Vec<Attachment>,
}
