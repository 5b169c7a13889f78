//! Blocking EWS client.

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};

use crate::error::{HarvestError, Result};
use crate::model::attachment::{Attachment, AttachmentId};
use crate::model::credentials::Credentials;
use crate::model::item::ItemId;

use super::response::{self, AttachmentPayload, FindPage, FolderInfo};
use super::soap;

/// Exchange Web Services client bound to one endpoint and one set of
/// credentials. Every call is a single request; nothing is retried.
pub struct EwsClient {
    http: Client,
    endpoint: String,
    username: String,
    password: SecretString,
}

impl EwsClient {
    /// Build a client. No request is made until the first call.
    pub fn new(endpoint: &str, credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("ewsharvest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            username: credentials.username.clone(),
            password: SecretString::from(credentials.password().to_string()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one SOAP envelope and return the response body.
    fn call(&self, action: &str, envelope: String) -> Result<String> {
        debug!(action, endpoint = %self.endpoint, "EWS request");
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(envelope)
            .send()?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(HarvestError::Authentication(format!(
                "server answered {status} for {}",
                self.username
            )));
        }

        let body = response.text()?;
        trace!(action, %status, bytes = body.len(), "EWS response");
        if !status.is_success() {
            // EWS reports faults with status 500 and a SOAP body.
            return Err(match response::fault_reason(&body) {
                Some(reason) => HarvestError::Fault(reason),
                None => HarvestError::Transport(format!("{action}: HTTP {status}")),
            });
        }
        Ok(body)
    }

    /// Look up the inbox of `mailbox`.
    pub fn get_inbox(&self, mailbox: &str) -> Result<FolderInfo> {
        let body = self.call("GetFolder", soap::get_inbox(mailbox))?;
        response::parse_get_folder(&body)
    }

    /// One page of the inbox listing starting at `offset`.
    pub fn find_items(
        &self,
        mailbox: &str,
        offset: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<FindPage> {
        let body = self.call("FindItem", soap::find_items(mailbox, offset, since))?;
        response::parse_find_items(&body)
    }

    /// Attachment metadata for each of `ids`.
    pub fn get_attachment_refs(&self, ids: &[ItemId]) -> Result<Vec<(ItemId, Vec<Attachment>)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.call("GetItem", soap::get_attachment_refs(ids))?;
        response::parse_attachment_refs(&body)
    }

    /// Content of one attachment.
    pub fn get_attachment(&self, id: &AttachmentId) -> Result<AttachmentPayload> {
        let body = self.call("GetAttachment", soap::get_attachment(id))?;
        response::parse_attachment(&body)
    }
}
