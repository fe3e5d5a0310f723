// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Normalization of raw log events into delivery-ready records.

use serde::Serialize;
use tracing::debug;

use crate::event::LogEvent;
use crate::severity::Severity;

/// Sentinel correlation id for lines without a request id.
pub const CORRELATION_UNAVAILABLE: &str = "n/a";

/// One normalized log record. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    /// Routing severity. Unrecognized level tokens map to `Info`.
    pub severity: Severity,
    /// The original level token, lower-cased, embedded in the delivery
    /// detail even when it is outside the recognized scale.
    pub raw_level: String,
    pub message: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_timestamp: Option<String>,
    /// Epoch milliseconds from the raw event.
    pub delivery_timestamp: i64,
}

/// A line that could not be classified. Not an error: a routing decision
/// that sends the original event to the dead-letter sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionFailure {
    pub event: LogEvent,
}

/// Normalizes one raw event, or reports that normalization is impossible.
///
/// A line without an extracted-fields structure is the only failure case.
/// Otherwise an explicit `level` field wins; failing that, a leading token
/// separated from the rest of the event text by a tab is taken as the level
/// candidate; failing that the whole text is the message at `INFO`.
pub fn extract(event: LogEvent) -> Result<NormalizedRecord, ExtractionFailure> {
    let Some(fields) = event.extracted_fields.clone() else {
        debug!(
            id = event.id.as_deref().unwrap_or("-"),
            "log event carries no extracted fields, routing to dead letter"
        );
        return Err(ExtractionFailure { event });
    };

    let text = fields.event.unwrap_or_default();
    let (level_token, message) = match fields.level {
        Some(level) => (level, text),
        None => match text.split_once('\t') {
            Some((token, rest)) => (token.to_string(), rest.to_string()),
            None => (Severity::Info.as_str().to_string(), text),
        },
    };

    Ok(NormalizedRecord {
        severity: Severity::parse(&level_token).unwrap_or(Severity::Info),
        raw_level: level_token.to_ascii_lowercase(),
        message: message.trim_end().to_string(),
        correlation_id: fields
            .request_id
            .unwrap_or_else(|| CORRELATION_UNAVAILABLE.to_string()),
        origin_timestamp: fields.timestamp,
        delivery_timestamp: event.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ExtractedFields;

    fn event(fields: Option<ExtractedFields>) -> LogEvent {
        LogEvent {
            id: Some("event-1".to_string()),
            timestamp: 1_700_000_000_000,
            message: Some("opaque".to_string()),
            extracted_fields: fields,
        }
    }

    fn fields() -> ExtractedFields {
        ExtractedFields {
            event: None,
            level: None,
            request_id: None,
            timestamp: None,
        }
    }

    #[test]
    fn line_without_fields_fails_extraction() {
        let raw = event(None);
        let failure = extract(raw.clone()).unwrap_err();
        assert_eq!(failure.event, raw);
        assert_eq!(failure.event.message.as_deref(), Some("opaque"));
    }

    #[test]
    fn explicit_level_field_wins() {
        let raw = event(Some(ExtractedFields {
            event: Some("something broke  ".to_string()),
            level: Some("error".to_string()),
            ..fields()
        }));
        let record = extract(raw).unwrap();
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.raw_level, "error");
        assert_eq!(record.message, "something broke");
    }

    #[test]
    fn tab_separated_leading_token_becomes_level() {
        let raw = event(Some(ExtractedFields {
            event: Some("WARN\tdisk almost full".to_string()),
            ..fields()
        }));
        let record = extract(raw).unwrap();
        assert_eq!(record.severity, Severity::Warn);
        assert_eq!(record.raw_level, "warn");
        assert_eq!(record.message, "disk almost full");
    }

    #[test]
    fn text_without_tab_defaults_to_info() {
        let raw = event(Some(ExtractedFields {
            event: Some("plain text line".to_string()),
            ..fields()
        }));
        let record = extract(raw).unwrap();
        assert_eq!(record.severity, Severity::Info);
        assert_eq!(record.raw_level, "info");
        assert_eq!(record.message, "plain text line");
    }

    #[test]
    fn unrecognized_level_routes_as_info_but_keeps_token() {
        let raw = event(Some(ExtractedFields {
            event: Some("CRITICAL\tmeltdown".to_string()),
            ..fields()
        }));
        let record = extract(raw).unwrap();
        assert_eq!(record.severity, Severity::Info);
        assert_eq!(record.raw_level, "critical");
        assert_eq!(record.message, "meltdown");
    }

    #[test]
    fn correlation_id_defaults_to_sentinel() {
        let raw = event(Some(ExtractedFields {
            event: Some("hello".to_string()),
            ..fields()
        }));
        let record = extract(raw).unwrap();
        assert_eq!(record.correlation_id, CORRELATION_UNAVAILABLE);
    }

    #[test]
    fn request_id_and_timestamp_are_copied_through() {
        let raw = event(Some(ExtractedFields {
            event: Some("hello".to_string()),
            request_id: Some("req-42".to_string()),
            timestamp: Some("2024-01-01T00:00:00Z".to_string()),
            ..fields()
        }));
        let record = extract(raw).unwrap();
        assert_eq!(record.correlation_id, "req-42");
        assert_eq!(
            record.origin_timestamp.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(record.delivery_timestamp, 1_700_000_000_000);
    }

    #[test]
    fn empty_event_text_yields_empty_info_record() {
        let raw = event(Some(fields()));
        let record = extract(raw).unwrap();
        assert_eq!(record.severity, Severity::Info);
        assert_eq!(record.message, "");
    }
}
