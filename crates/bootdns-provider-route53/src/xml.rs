//! Route 53 XML documents
//!
//! Responses are decoded with quick-xml's serde support; the one request
//! body the provider sends is written by hand.

use bootdns_core::traits::{ChangeBatch, RecordSet};
use bootdns_core::{Error, Result};
use quick_xml::escape::escape;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt::Write;

const XMLNS: &str = "https://route53.amazonaws.com/doc/2013-04-01/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListHostedZonesResponse {
    #[serde(default)]
    pub hosted_zones: HostedZones,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    pub items: Vec<HostedZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub config: Option<HostedZoneConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZoneConfig {
    #[serde(default)]
    pub private_zone: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResourceRecordSetsResponse {
    #[serde(default)]
    pub resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_record_name: Option<String>,
    #[serde(default)]
    pub next_record_type: Option<String>,
    #[serde(default)]
    pub next_record_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    pub items: Vec<ResourceRecordSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "TTL", default)]
    pub ttl: Option<u32>,
    /// Alias records carry an `AliasTarget` instead
    #[serde(default)]
    pub resource_records: Option<ResourceRecords>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    pub items: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub value: String,
}

impl ResourceRecordSet {
    pub fn into_record_set(self) -> RecordSet {
        let Ok(record_type) = self.record_type.parse();
        RecordSet {
            name: unescape_name(&self.name),
            record_type,
            ttl: self.ttl,
            values: self
                .resource_records
                .map(|r| r.items.into_iter().map(|rr| rr.value).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeResourceRecordSetsResponse {
    pub change_info: ChangeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeInfo {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body, either `<ErrorResponse><Error>..` or `<InvalidChangeBatch><Messages>..`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    messages: Option<ErrorMessages>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorMessages {
    #[serde(rename = "Message", default)]
    items: Vec<String>,
}

/// Error code and message extracted from a failed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Decode a response document
pub fn parse<T: DeserializeOwned>(body: &str) -> Result<T> {
    quick_xml::de::from_str(body)
        .map_err(|e| Error::provider("route53", format!("Failed to parse response: {}", e)))
}

/// Extract the code and message of an error response
///
/// Bodies that are not Route 53 error documents are reported verbatim.
pub fn parse_error(body: &str) -> ApiError {
    match quick_xml::de::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(detail),
            ..
        }) => ApiError {
            code: detail.code,
            message: detail.message,
        },
        Ok(ErrorBody {
            messages: Some(messages),
            ..
        }) => ApiError {
            code: "InvalidChangeBatch".to_string(),
            message: messages.items.join("; "),
        },
        _ => ApiError {
            code: "Unknown".to_string(),
            message: body.trim().chars().take(200).collect(),
        },
    }
}

/// Serialize a change batch as a `ChangeResourceRecordSetsRequest`
pub fn change_batch_request(batch: &ChangeBatch) -> String {
    let mut body = String::new();
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = write!(body, r#"<ChangeResourceRecordSetsRequest xmlns="{}">"#, XMLNS);
    body.push_str("<ChangeBatch>");
    if let Some(comment) = &batch.comment {
        let _ = write!(body, "<Comment>{}</Comment>", escape(comment.as_str()));
    }
    body.push_str("<Changes>");
    for change in &batch.changes {
        let set = &change.record_set;
        body.push_str("<Change>");
        let _ = write!(body, "<Action>{}</Action>", change.action.as_str());
        body.push_str("<ResourceRecordSet>");
        let _ = write!(body, "<Name>{}</Name>", escape(set.name.as_str()));
        let _ = write!(body, "<Type>{}</Type>", escape(set.record_type.as_str()));
        if let Some(ttl) = set.ttl {
            let _ = write!(body, "<TTL>{}</TTL>", ttl);
        }
        body.push_str("<ResourceRecords>");
        for value in &set.values {
            let _ = write!(
                body,
                "<ResourceRecord><Value>{}</Value></ResourceRecord>",
                escape(value.as_str())
            );
        }
        body.push_str("</ResourceRecords></ResourceRecordSet></Change>");
    }
    body.push_str("</Changes></ChangeBatch></ChangeResourceRecordSetsRequest>");
    body
}

/// Undo Route 53's `\ddd` octal escaping of names (e.g. `\052` for `*`)
pub fn unescape_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..=i + 3].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = bytes[i + 1..=i + 3]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
