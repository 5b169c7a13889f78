//! Attachment variants.
//!
//! Listing an item only yields attachment metadata. The payload (file bytes
//! or the embedded item) is fetched separately, and only when the attachment
//! qualifies for storage.

/// Opaque server-side identifier of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentId(pub String);

/// An attachment on a [`MailItem`](super::item::MailItem).
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    /// A named file with a byte payload.
    File(FileAttachment),
    /// Another mail item embedded in the message (e.g. a forwarded email).
    Item(ItemAttachment),
    /// An attachment shape this crate does not handle, e.g. a
    /// `ReferenceAttachment` pointing at a cloud file. Always skipped.
    Other {
        name: String,
        /// Element name the server used for the attachment.
        kind: String,
    },
}

impl Attachment {
    /// Display name of the attachment.
    pub fn name(&self) -> &str {
        match self {
            Attachment::File(file) => &file.name,
            Attachment::Item(item) => &item.name,
            Attachment::Other { name, .. } => name,
        }
    }
}

/// Metadata of a file attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttachment {
    pub id: AttachmentId,
    /// File name as sent by the client, including the extension.
    pub name: String,
}

/// Metadata of an item attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAttachment {
    pub id: AttachmentId,
    pub name: String,
}

/// The item carried by an [`ItemAttachment`].
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedItem {
    /// A plain email message.
    Message(EmbeddedMessage),
    /// Any other item type (calendar item, contact, task, ...).
    Other {
        /// Element name the server used for the item, e.g. `CalendarItem`.
        kind: String,
    },
}

/// An email message embedded as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedMessage {
    pub subject: String,
    /// Body as returned by the server (text or HTML).
    pub body: String,
}
