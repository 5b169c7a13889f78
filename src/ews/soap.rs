//! SOAP request bodies for the EWS operations we use.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;

use crate::model::attachment::AttachmentId;
use crate::model::item::ItemId;

/// Schema version sent in every request header.
pub const REQUEST_SERVER_VERSION: &str = "Exchange2013_SP1";

/// Items requested per `FindItem` page.
pub const PAGE_SIZE: u32 = 100;

fn envelope(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/""#,
            r#" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types""#,
            r#" xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">"#,
            r#"<soap:Header><t:RequestServerVersion Version="{version}"/></soap:Header>"#,
            r#"<soap:Body>{body}</soap:Body>"#,
            r#"</soap:Envelope>"#
        ),
        version = REQUEST_SERVER_VERSION,
        body = body
    )
}

fn inbox_folder_id(mailbox: &str) -> String {
    format!(
        r#"<t:DistinguishedFolderId Id="inbox"><t:Mailbox><t:EmailAddress>{}</t:EmailAddress></t:Mailbox></t:DistinguishedFolderId>"#,
        escape(mailbox)
    )
}

fn item_id(id: &ItemId) -> String {
    if id.change_key.is_empty() {
        format!(r#"<t:ItemId Id="{}"/>"#, escape(&id.id))
    } else {
        format!(
            r#"<t:ItemId Id="{}" ChangeKey="{}"/>"#,
            escape(&id.id),
            escape(&id.change_key)
        )
    }
}

/// `GetFolder` for the inbox of `mailbox`.
pub fn get_inbox(mailbox: &str) -> String {
    envelope(&format!(
        concat!(
            "<m:GetFolder>",
            "<m:FolderShape><t:BaseShape>IdOnly</t:BaseShape>",
            r#"<t:AdditionalProperties><t:FieldURI FieldURI="folder:TotalCount"/></t:AdditionalProperties>"#,
            "</m:FolderShape>",
            "<m:FolderIds>{folder}</m:FolderIds>",
            "</m:GetFolder>"
        ),
        folder = inbox_folder_id(mailbox)
    ))
}

/// One `FindItem` page over the inbox, optionally restricted by receive time.
pub fn find_items(mailbox: &str, offset: u32, since: Option<DateTime<Utc>>) -> String {
    let restriction = since
        .map(|since| {
            format!(
                concat!(
                    "<m:Restriction><t:IsGreaterThanOrEqualTo>",
                    r#"<t:FieldURI FieldURI="item:DateTimeReceived"/>"#,
                    r#"<t:FieldURIOrConstant><t:Constant Value="{}"/></t:FieldURIOrConstant>"#,
                    "</t:IsGreaterThanOrEqualTo></m:Restriction>"
                ),
                since.to_rfc3339_opts(SecondsFormat::Secs, true)
            )
        })
        .unwrap_or_default();

    envelope(&format!(
        concat!(
            r#"<m:FindItem Traversal="Shallow">"#,
            "<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape><t:AdditionalProperties>",
            r#"<t:FieldURI FieldURI="item:DateTimeReceived"/>"#,
            r#"<t:FieldURI FieldURI="item:HasAttachments"/>"#,
            "</t:AdditionalProperties></m:ItemShape>",
            r#"<m:IndexedPageItemView MaxEntriesReturned="{page}" Offset="{offset}" BasePoint="Beginning"/>"#,
            "{restriction}",
            r#"<m:SortOrder><t:FieldOrder Order="Ascending"><t:FieldURI FieldURI="item:DateTimeReceived"/></t:FieldOrder></m:SortOrder>"#,
            "<m:ParentFolderIds>{folder}</m:ParentFolderIds>",
            "</m:FindItem>"
        ),
        page = PAGE_SIZE,
        offset = offset,
        restriction = restriction,
        folder = inbox_folder_id(mailbox)
    ))
}

/// `GetItem` returning the attachment list of each item.
pub fn get_attachment_refs(ids: &[ItemId]) -> String {
    let ids: String = ids.iter().map(item_id).collect();
    envelope(&format!(
        concat!(
            "<m:GetItem>",
            "<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape><t:AdditionalProperties>",
            r#"<t:FieldURI FieldURI="item:Attachments"/>"#,
            "</t:AdditionalProperties></m:ItemShape>",
            "<m:ItemIds>{ids}</m:ItemIds>",
            "</m:GetItem>"
        ),
        ids = ids
    ))
}

/// `GetAttachment` for a single attachment, including its content.
pub fn get_attachment(id: &AttachmentId) -> String {
    envelope(&format!(
        concat!(
            "<m:GetAttachment>",
            "<m:AttachmentShape><t:IncludeMimeContent>false</t:IncludeMimeContent>",
            "<t:BodyType>Best</t:BodyType></m:AttachmentShape>",
            r#"<m:AttachmentIds><t:AttachmentId Id="{id}"/></m:AttachmentIds>"#,
            "</m:GetAttachment>"
        ),
        id = escape(&id.0)
    ))
}
