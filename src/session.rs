//! Opening an authenticated inbox session.

use std::io::Write;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{HarvestError, Result};
use crate::ews::response::AttachmentPayload;
use crate::ews::EwsClient;
use crate::mailbox::{ItemQuery, MailFolder};
use crate::model::attachment::{EmbeddedItem, FileAttachment, ItemAttachment};
use crate::model::credentials::Credentials;
use crate::model::item::MailItem;

/// Authenticated handle to one mailbox's inbox.
///
/// The server endpoint comes from configuration; autodiscovery is never
/// performed. Access is delegate access to the mailbox address.
pub struct Inbox {
    client: EwsClient,
    mailbox: String,
    total_count: Option<u64>,
}

/// Log in and return the inbox of the credentials' mailbox.
///
/// Progress lines go to `out`. The login is verified by fetching the inbox
/// folder, so bad credentials fail here.
pub fn establish(
    credentials: &Credentials,
    settings: &Settings,
    out: &mut dyn Write,
) -> Result<Inbox> {
    writeln!(out, "Logging in...")?;
    let mailbox = credentials.mailbox_address().to_string();
    let client = EwsClient::new(&settings.endpoint, credentials)?;
    let folder = client.get_inbox(&mailbox)?;
    info!(mailbox = %mailbox, endpoint = %client.endpoint(), "Opened inbox");
    writeln!(out, "Login successful.")?;

    Ok(Inbox {
        client,
        mailbox,
        total_count: folder.total_count,
    })
}

impl Inbox {
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Item count reported when the inbox was opened.
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }
}

impl MailFolder for Inbox {
    fn items(&self, query: &ItemQuery) -> Result<Vec<MailItem>> {
        let since = match query {
            ItemQuery::All => None,
            ItemQuery::ReceivedSince(boundary) => Some(boundary.with_timezone(&Utc)),
        };

        let mut items = Vec::new();
        let mut offset = Some(0);
        while let Some(current) = offset {
            let page = self.client.find_items(&self.mailbox, current, since)?;
            debug!(
                offset = current,
                count = page.items.len(),
                flagged = page.items.iter().filter(|found| found.has_attachments).count(),
                "Fetched inbox page"
            );

            // HasAttachments is false for items whose attachments are all
            // inline, so every item's attachment list is requested.
            let ids: Vec<_> = page.items.iter().map(|found| found.id.clone()).collect();
            let mut refs = self.client.get_attachment_refs(&ids)?;

            for found in page.items {
                let attachments = refs
                    .iter()
                    .position(|(id, _)| id.id == found.id.id)
                    .map(|pos| refs.swap_remove(pos).1)
                    .unwrap_or_default();
                items.push(MailItem {
                    id: found.id,
                    received: found.received,
                    attachments,
                });
            }
            offset = page.next_offset;
        }
        Ok(items)
    }

    fn file_content(&self, attachment: &FileAttachment) -> Result<Vec<u8>> {
        match self.client.get_attachment(&attachment.id)? {
            AttachmentPayload::File(content) => Ok(content),
            AttachmentPayload::Item(_) => Err(HarvestError::MalformedResponse(format!(
                "'{}' was listed as a file attachment but returned an item",
                attachment.name
            ))),
        }
    }

    fn embedded_item(&self, attachment: &ItemAttachment) -> Result<EmbeddedItem> {
        match self.client.get_attachment(&attachment.id)? {
            AttachmentPayload::Item(item) => Ok(item),
            AttachmentPayload::File(_) => Err(HarvestError::MalformedResponse(format!(
                "'{}' was listed as an item attachment but returned a file",
                attachment.name
            ))),
        }
    }
}
