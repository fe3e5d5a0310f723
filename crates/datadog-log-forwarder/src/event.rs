// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Inbound payload model and decoding.
//!
//! A batch arrives either through the CloudWatch subscription path as
//! `{"awslogs": {"data": base64(gzip(json))}}`, or as the already-decoded
//! JSON document when submitted out of band. Both decode to [`LogsBatch`].

use std::io::Read;

use base64::Engine;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ForwarderError;

/// One subscription delivery: the unit of work per invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsBatch {
    pub log_group: String,
    pub log_stream: String,
    #[serde(default)]
    pub log_events: Vec<LogEvent>,
}

/// One raw log line captured by the subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "extractedFields",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extracted_fields: Option<ExtractedFields>,
}

/// Fields pre-extracted by the subscription filter pattern, when one was
/// configured upstream. Field names follow the upstream wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Decodes an invocation payload into a batch.
///
/// Returns `Ok(None)` for an absent or empty payload, which is a legal
/// no-op invocation. Decompression and parse failures surface verbatim.
pub fn decode_payload(payload: &Value) -> Result<Option<LogsBatch>, ForwarderError> {
    if payload.is_null() {
        return Ok(None);
    }

    if let Some(data) = payload.pointer("/awslogs/data").and_then(Value::as_str) {
        let compressed = base64::engine::general_purpose::STANDARD.decode(data)?;
        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut json = String::new();
        decoder.read_to_string(&mut json)?;
        let batch = serde_json::from_str(&json)?;
        return Ok(Some(batch));
    }

    if payload.as_object().is_some_and(|document| document.is_empty()) {
        return Ok(None);
    }

    let batch = serde_json::from_value(payload.clone())?;
    Ok(Some(batch))
}
