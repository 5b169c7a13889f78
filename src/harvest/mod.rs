//! Attachment harvesting: walk the inbox and store qualifying attachments.
//!
//! For each attachment, in order:
//! 1. a file attachment with an allowed extension is stored under its name;
//! 2. an item attachment holding a plain message is stored under the
//!    message subject, if attached emails are enabled;
//! 3. anything else, including attachment types the server reports but this
//!    crate does not handle, is skipped.

pub mod filter;
pub mod storage;
pub mod window;

use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDateTime};
use chrono_tz::Tz;
use tracing::{debug, info, info_span};

use crate::config::Settings;
use crate::error::Result;
use crate::mailbox::{ItemQuery, MailFolder};
use crate::model::attachment::{Attachment, EmbeddedItem};

use self::storage::{timestamp_segment, ArtifactStore};

/// What kind of payload a stored artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A file attachment.
    File,
    /// The body of an embedded email.
    Email,
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    /// The retention boundary was computed. Emitted once, before enumeration.
    Boundary(DateTime<Tz>),
    /// An artifact was written.
    Saved { kind: ArtifactKind, path: PathBuf },
    /// An attachment did not qualify.
    Skipped { name: String },
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestReport {
    /// Items visited.
    pub items: usize,
    /// Paths written, in order. A path overwritten later appears twice.
    pub saved: Vec<PathBuf>,
    /// Attachments skipped.
    pub skipped: usize,
    /// Total payload bytes written.
    pub bytes: u64,
}

/// Walks a [`MailFolder`] and stores qualifying attachments.
pub struct Harvester<'a, F: MailFolder + ?Sized> {
    folder: &'a F,
    settings: &'a Settings,
    store: ArtifactStore,
}

impl<'a, F: MailFolder + ?Sized> Harvester<'a, F> {
    pub fn new(folder: &'a F, settings: &'a Settings) -> Self {
        Self {
            folder,
            settings,
            store: ArtifactStore::new(&settings.download_root),
        }
    }

    /// Run against the current local time.
    pub fn run(&self, on_event: &mut dyn FnMut(&HarvestEvent)) -> Result<HarvestReport> {
        self.run_at(Local::now().naive_local(), on_event)
    }

    /// Run as if the current local time were `now`.
    ///
    /// Stops at the first error; artifacts written before it stay on disk.
    pub fn run_at(
        &self,
        now: NaiveDateTime,
        on_event: &mut dyn FnMut(&HarvestEvent),
    ) -> Result<HarvestReport> {
        let _span = info_span!("harvest", root = %self.store.root().display()).entered();

        let cutoff = window::retention_cutoff(now, self.settings.retention);
        let boundary = window::protocol_boundary(cutoff, self.settings.timezone);
        on_event(&HarvestEvent::Boundary(boundary));

        let query = if self.settings.apply_retention_filter {
            ItemQuery::ReceivedSince(boundary)
        } else {
            ItemQuery::All
        };
        debug!(?query, "Listing inbox");

        let mut items = self.folder.items(&query)?;
        if self.settings.apply_retention_filter {
            // The listing may not have applied the restriction itself.
            items.retain(|item| item.received >= boundary);
        }
        info!(count = items.len(), "Enumerated inbox");

        let mut report = HarvestReport::default();
        for item in &items {
            report.items += 1;
            let segment = timestamp_segment(&item.received);
            for attachment in &item.attachments {
                self.process(attachment, &segment, &mut report, on_event)?;
            }
        }

        info!(
            items = report.items,
            saved = report.saved.len(),
            skipped = report.skipped,
            "Harvest finished"
        );
        Ok(report)
    }

    fn process(
        &self,
        attachment: &Attachment,
        segment: &str,
        report: &mut HarvestReport,
        on_event: &mut dyn FnMut(&HarvestEvent),
    ) -> Result<()> {
        let stored = match attachment {
            Attachment::File(file) if self.settings.extensions.is_valid_extension(&file.name) => {
                let content = self.folder.file_content(file)?;
                let path = self.store.save(segment, &file.name, &content)?;
                Some((ArtifactKind::File, path, content.len()))
            }
            Attachment::Item(item) if self.settings.download_attached_emails => {
                match self.folder.embedded_item(item)? {
                    EmbeddedItem::Message(message) => {
                        let body = message.body.as_bytes();
                        let path = self.store.save(segment, &message.subject, body)?;
                        Some((ArtifactKind::Email, path, body.len()))
                    }
                    EmbeddedItem::Other { kind } => {
                        debug!(name = %item.name, kind = %kind, "Embedded item is not a message");
                        None
                    }
                }
            }
            Attachment::Other { kind, .. } => {
                debug!(name = %attachment.name(), kind = %kind, "Unsupported attachment type");
                None
            }
            Attachment::File(_) | Attachment::Item(_) => None,
        };

        match stored {
            Some((kind, path, len)) => {
                report.bytes += len as u64;
                report.saved.push(path.clone());
                on_event(&HarvestEvent::Saved { kind, path });
            }
            None => {
                report.skipped += 1;
                on_event(&HarvestEvent::Skipped {
                    name: attachment.name().to_string(),
                });
            }
        }
        Ok(())
    }
}
