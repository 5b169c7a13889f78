//! Decoding EWS response bodies.

use base64::Engine;
use chrono::{DateTime, FixedOffset};

use crate::error::{HarvestError, Result};
use crate::model::attachment::{
    Attachment, AttachmentId, EmbeddedItem, EmbeddedMessage, FileAttachment, ItemAttachment,
};
use crate::model::item::ItemId;

use super::xml::{self, Element};

/// Inbox folder returned by `GetFolder`.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderInfo {
    pub id: String,
    pub total_count: Option<u64>,
}

/// Item header returned by `FindItem`.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundItem {
    pub id: ItemId,
    pub received: DateTime<FixedOffset>,
    /// Server flag. It is `false` when every attachment is inline, so it
    /// does not decide whether attachments are listed.
    pub has_attachments: bool,
}

/// One page of `FindItem` results.
#[derive(Debug, Clone, PartialEq)]
pub struct FindPage {
    pub items: Vec<FoundItem>,
    /// Offset of the next page, or `None` when this page was the last.
    pub next_offset: Option<u32>,
}

/// Payload returned by `GetAttachment`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentPayload {
    File(Vec<u8>),
    Item(EmbeddedItem),
}

/// Parse a body, surface SOAP faults, and check every response message.
///
/// Returns the `ResponseMessages` element.
fn checked_messages(body: &str) -> Result<Element> {
    let root = xml::parse(body)?;
    if let Some(fault) = root.find("Fault") {
        let reason = fault
            .child_text("faultstring")
            .or_else(|| fault.find("Text").map(|t| t.text.as_str()))
            .unwrap_or("unknown fault");
        return Err(HarvestError::Fault(reason.trim().to_string()));
    }

    let messages = root.require("ResponseMessages")?.clone();
    for message in &messages.children {
        if message.attr("ResponseClass") == Some("Error") {
            return Err(HarvestError::Service {
                code: message
                    .child_text("ResponseCode")
                    .unwrap_or("UnknownError")
                    .trim()
                    .to_string(),
                message: message
                    .child_text("MessageText")
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            });
        }
    }
    Ok(messages)
}

/// Extract the SOAP fault text from a body, if it is a fault.
pub fn fault_reason(body: &str) -> Option<String> {
    match checked_messages(body) {
        Err(HarvestError::Fault(reason)) => Some(reason),
        _ => None,
    }
}

fn parse_item_id(element: &Element) -> Result<ItemId> {
    let id = element.require("ItemId")?;
    Ok(ItemId {
        id: id
            .attr("Id")
            .ok_or_else(|| HarvestError::MalformedResponse("ItemId without Id".to_string()))?
            .to_string(),
        change_key: id.attr("ChangeKey").unwrap_or_default().to_string(),
    })
}

fn parse_attachment_id(element: &Element) -> Result<AttachmentId> {
    element
        .child("AttachmentId")
        .and_then(|id| id.attr("Id"))
        .map(|id| AttachmentId(id.to_string()))
        .ok_or_else(|| HarvestError::MalformedResponse("attachment without id".to_string()))
}

/// Decode a `GetFolder` response.
pub fn parse_get_folder(body: &str) -> Result<FolderInfo> {
    let messages = checked_messages(body)?;
    let folder_id = messages.require("FolderId")?;
    Ok(FolderInfo {
        id: folder_id.attr("Id").unwrap_or_default().to_string(),
        total_count: messages
            .find("TotalCount")
            .and_then(|c| c.text.trim().parse().ok()),
    })
}

/// Decode a `FindItem` response page.
pub fn parse_find_items(body: &str) -> Result<FindPage> {
    let messages = checked_messages(body)?;
    let root_folder = messages.require("RootFolder")?;

    let mut items = Vec::new();
    if let Some(list) = root_folder.child("Items") {
        // Every child is an item (Message, MeetingRequest, ...).
        for element in &list.children {
            let received = element.child_text("DateTimeReceived").ok_or_else(|| {
                HarvestError::MalformedResponse("item without DateTimeReceived".to_string())
            })?;
            let received = DateTime::parse_from_rfc3339(received.trim()).map_err(|e| {
                HarvestError::MalformedResponse(format!("bad DateTimeReceived '{received}': {e}"))
            })?;
            items.push(FoundItem {
                id: parse_item_id(element)?,
                received,
                has_attachments: element
                    .child_text("HasAttachments")
                    .is_some_and(|flag| flag.trim() == "true"),
            });
        }
    }

    let last = root_folder.attr("IncludesLastItemInRange") != Some("false");
    let next_offset = if last || items.is_empty() {
        None
    } else {
        let offset = root_folder
            .attr("IndexedPagingOffset")
            .and_then(|o| o.parse().ok())
            .ok_or_else(|| {
                HarvestError::MalformedResponse("missing IndexedPagingOffset".to_string())
            })?;
        Some(offset)
    };

    Ok(FindPage { items, next_offset })
}

/// Decode a `GetItem` response into attachment lists, one per requested item.
pub fn parse_attachment_refs(body: &str) -> Result<Vec<(ItemId, Vec<Attachment>)>> {
    let messages = checked_messages(body)?;
    let mut result = Vec::new();

    for message in &messages.children {
        let Some(list) = message.child("Items") else {
            continue;
        };
        for item in &list.children {
            let id = parse_item_id(item)?;
            let mut attachments = Vec::new();
            if let Some(refs) = item.child("Attachments") {
                for element in &refs.children {
                    let name = element.child_text("Name").unwrap_or_default().to_string();
                    let attachment = match element.name.as_str() {
                        "FileAttachment" => Attachment::File(FileAttachment {
                            id: parse_attachment_id(element)?,
                            name,
                        }),
                        "ItemAttachment" => Attachment::Item(ItemAttachment {
                            id: parse_attachment_id(element)?,
                            name,
                        }),
                        other => Attachment::Other {
                            name,
                            kind: other.to_string(),
                        },
                    };
                    attachments.push(attachment);
                }
            }
            result.push((id, attachments));
        }
    }
    Ok(result)
}

/// Decode a `GetAttachment` response for a single attachment.
pub fn parse_attachment(body: &str) -> Result<AttachmentPayload> {
    let messages = checked_messages(body)?;
    let attachments = messages.require("Attachments")?;
    let element = attachments
        .children
        .first()
        .ok_or_else(|| HarvestError::MalformedResponse("no attachment returned".to_string()))?;

    match element.name.as_str() {
        "FileAttachment" => {
            let encoded: String = element
                .child_text("Content")
                .unwrap_or_default()
                .split_whitespace()
                .collect();
            let content = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| {
                    HarvestError::MalformedResponse(format!("attachment content: {e}"))
                })?;
            Ok(AttachmentPayload::File(content))
        }
        "ItemAttachment" => {
            let item = element
                .children
                .iter()
                .find(|c| !matches!(c.name.as_str(), "AttachmentId" | "Name" | "ContentType"
                    | "ContentId" | "ContentLocation" | "Size" | "LastModifiedTime" | "IsInline"))
                .ok_or_else(|| {
                    HarvestError::MalformedResponse("item attachment without item".to_string())
                })?;
            let embedded = if item.name == "Message" {
                EmbeddedItem::Message(EmbeddedMessage {
                    subject: item.child_text("Subject").unwrap_or_default().to_string(),
                    body: item.child_text("Body").unwrap_or_default().to_string(),
                })
            } else {
                EmbeddedItem::Other {
                    kind: item.name.clone(),
                }
            };
            Ok(AttachmentPayload::Item(embedded))
        }
        other => Err(HarvestError::MalformedResponse(format!(
            "unexpected attachment type <{other}>"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(inner: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">"#,
                r#"<s:Body><m:Response xmlns:m="urn:m" xmlns:t="urn:t">"#,
                "<m:ResponseMessages>{}</m:ResponseMessages>",
                "</m:Response></s:Body></s:Envelope>"
            ),
            inner
        )
    }

    #[test]
    fn test_error_response_class() {
        let body = wrap(concat!(
            r#"<m:FindItemResponseMessage ResponseClass="Error">"#,
            "<m:MessageText>The specified object was not found in the store.</m:MessageText>",
            "<m:ResponseCode>ErrorItemNotFound</m:ResponseCode>",
            "</m:FindItemResponseMessage>"
        ));
        match parse_find_items(&body) {
            Err(HarvestError::Service { code, message }) => {
                assert_eq!(code, "ErrorItemNotFound");
                assert!(message.contains("not found"));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_soap_fault() {
        let body = concat!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>"#,
            "<s:Fault><faultcode>a:ErrorSchemaValidation</faultcode>",
            "<faultstring>The request failed schema validation.</faultstring>",
            "</s:Fault></s:Body></s:Envelope>"
        );
        assert_eq!(
            fault_reason(body).as_deref(),
            Some("The request failed schema validation.")
        );
        assert!(matches!(parse_get_folder(body), Err(HarvestError::Fault(_))));
    }

    #[test]
    fn test_find_items_page() {
        let body = wrap(concat!(
            r#"<m:FindItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode>"#,
            r#"<m:RootFolder IndexedPagingOffset="2" TotalItemsInView="3" IncludesLastItemInRange="false"><t:Items>"#,
            r#"<t:Message><t:ItemId Id="A" ChangeKey="k"/><t:DateTimeReceived>2024-03-01T10:15:30Z</t:DateTimeReceived><t:HasAttachments>true</t:HasAttachments></t:Message>"#,
            r#"<t:MeetingRequest><t:ItemId Id="B"/><t:DateTimeReceived>2024-03-02T08:00:00Z</t:DateTimeReceived><t:HasAttachments>false</t:HasAttachments></t:MeetingRequest>"#,
            "</t:Items></m:RootFolder></m:FindItemResponseMessage>"
        ));
        let page = parse_find_items(&body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_offset, Some(2));
        assert_eq!(page.items[0].id.change_key, "k");
        assert!(page.items[0].has_attachments);
        assert!(!page.items[1].has_attachments);
        assert_eq!(page.items[0].received.to_rfc3339(), "2024-03-01T10:15:30+00:00");
    }

    #[test]
    fn test_find_items_last_page() {
        let body = wrap(concat!(
            r#"<m:FindItemResponseMessage ResponseClass="Success">"#,
            r#"<m:RootFolder IndexedPagingOffset="0" TotalItemsInView="0" IncludesLastItemInRange="true"><t:Items/></m:RootFolder>"#,
            "</m:FindItemResponseMessage>"
        ));
        let page = parse_find_items(&body).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn test_attachment_refs() {
        let body = wrap(concat!(
            r#"<m:GetItemResponseMessage ResponseClass="Success"><m:Items><t:Message><t:ItemId Id="A"/>"#,
            "<t:Attachments>",
            r#"<t:FileAttachment><t:AttachmentId Id="f1"/><t:Name>invoice.pdf</t:Name></t:FileAttachment>"#,
            r#"<t:ItemAttachment><t:AttachmentId Id="i1"/><t:Name>Fwd: hello</t:Name></t:ItemAttachment>"#,
            "</t:Attachments></t:Message></m:Items></m:GetItemResponseMessage>"
        ));
        let refs = parse_attachment_refs(&body).unwrap();
        assert_eq!(refs.len(), 1);
        let (id, attachments) = &refs[0];
        assert_eq!(id.id, "A");
        assert_eq!(
            attachments[0],
            Attachment::File(FileAttachment {
                id: AttachmentId("f1".to_string()),
                name: "invoice.pdf".to_string(),
            })
        );
        assert_eq!(attachments[1].name(), "Fwd: hello");
    }

    #[test]
    fn test_unknown_attachment_type_is_listed() {
        let body = wrap(concat!(
            r#"<m:GetItemResponseMessage ResponseClass="Success"><m:Items><t:Message><t:ItemId Id="A"/>"#,
            "<t:Attachments>",
            r#"<t:ReferenceAttachment><t:AttachmentId Id="r1"/><t:Name>budget.xlsx</t:Name></t:ReferenceAttachment>"#,
            "</t:Attachments></t:Message></m:Items></m:GetItemResponseMessage>"
        ));
        let refs = parse_attachment_refs(&body).unwrap();
        assert_eq!(
            refs[0].1,
            vec![Attachment::Other {
                name: "budget.xlsx".to_string(),
                kind: "ReferenceAttachment".to_string(),
            }]
        );
    }

    #[test]
    fn test_attachment_name_keeps_whitespace() {
        let body = wrap(concat!(
            r#"<m:GetItemResponseMessage ResponseClass="Success"><m:Items><t:Message><t:ItemId Id="A"/>"#,
            "<t:Attachments>",
            r#"<t:FileAttachment><t:AttachmentId Id="f1"/><t:Name> notes .pdf</t:Name></t:FileAttachment>"#,
            "</t:Attachments></t:Message></m:Items></m:GetItemResponseMessage>"
        ));
        let refs = parse_attachment_refs(&body).unwrap();
        assert_eq!(refs[0].1[0].name(), " notes .pdf");
    }

    #[test]
    fn test_file_attachment_content() {
        let body = wrap(concat!(
            r#"<m:GetAttachmentResponseMessage ResponseClass="Success"><m:Attachments>"#,
            r#"<t:FileAttachment><t:AttachmentId Id="f1"/><t:Name>a.pdf</t:Name><t:Content>JVBE
RiEx</t:Content></t:FileAttachment>"#,
            "</m:Attachments></m:GetAttachmentResponseMessage>"
        ));
        assert_eq!(
            parse_attachment(&body).unwrap(),
            AttachmentPayload::File(b"%PDF!1".to_vec())
        );
    }

    #[test]
    fn test_item_attachment_message_and_other() {
        let message = wrap(concat!(
            r#"<m:GetAttachmentResponseMessage ResponseClass="Success"><m:Attachments>"#,
            r#"<t:ItemAttachment><t:AttachmentId Id="i1"/><t:Name>Fwd</t:Name><t:Message>"#,
            r#"<t:Subject>Quarterly numbers</t:Subject><t:Body BodyType="Text">See below &amp; above</t:Body>"#,
            "</t:Message></t:ItemAttachment></m:Attachments></m:GetAttachmentResponseMessage>"
        ));
        assert_eq!(
            parse_attachment(&message).unwrap(),
            AttachmentPayload::Item(EmbeddedItem::Message(EmbeddedMessage {
                subject: "Quarterly numbers".to_string(),
                body: "See below & above".to_string(),
            }))
        );

        let indented = wrap(concat!(
            r#"<m:GetAttachmentResponseMessage ResponseClass="Success"><m:Attachments>"#,
            r#"<t:ItemAttachment><t:AttachmentId Id="i1"/><t:Name>Fwd</t:Name><t:Message>"#,
            "\n  <t:Subject>Re: thanks</t:Subject>\n",
            "  <t:Body BodyType=\"Text\">  Hi,\n\nthanks\n</t:Body>\n",
            "</t:Message></t:ItemAttachment></m:Attachments></m:GetAttachmentResponseMessage>"
        ));
        assert_eq!(
            parse_attachment(&indented).unwrap(),
            AttachmentPayload::Item(EmbeddedItem::Message(EmbeddedMessage {
                subject: "Re: thanks".to_string(),
                body: "  Hi,\n\nthanks\n".to_string(),
            }))
        );

        let calendar = wrap(concat!(
            r#"<m:GetAttachmentResponseMessage ResponseClass="Success"><m:Attachments>"#,
            r#"<t:ItemAttachment><t:AttachmentId Id="i2"/><t:Name>Invite</t:Name><t:CalendarItem>"#,
            "<t:Subject>Standup</t:Subject></t:CalendarItem></t:ItemAttachment>",
            "</m:Attachments></m:GetAttachmentResponseMessage>"
        ));
        assert_eq!(
            parse_attachment(&calendar).unwrap(),
            AttachmentPayload::Item(EmbeddedItem::Other {
                kind: "CalendarItem".to_string()
            })
        );
    }
}
