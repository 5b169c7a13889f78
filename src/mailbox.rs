//! The mailbox folder seam between the harvester and the mail server.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::Result;
use crate::model::attachment::{EmbeddedItem, FileAttachment, ItemAttachment};
use crate::model::item::MailItem;

/// Which items a folder listing should return.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemQuery {
    /// Every item in the folder.
    All,
    /// Items received at or after the given instant.
    ReceivedSince(DateTime<Tz>),
}

/// A folder of mail items.
///
/// Implementations are not required to honor [`ItemQuery::ReceivedSince`]
/// exactly; callers filter the result again.
pub trait MailFolder {
    /// List items together with their attachment metadata.
    fn items(&self, query: &ItemQuery) -> Result<Vec<MailItem>>;

    /// Fetch the payload of a file attachment.
    fn file_content(&self, attachment: &FileAttachment) -> Result<Vec<u8>>;

    /// Fetch the item embedded in an item attachment.
    fn embedded_item(&self, attachment: &ItemAttachment) -> Result<EmbeddedItem>;
}
