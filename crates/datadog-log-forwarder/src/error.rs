// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while forwarding a log batch.
///
/// Configuration and decode errors abort an invocation before any side
/// effect; delivery errors abort only after the dead-letter forwarding
/// attempt for that invocation has been made.
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    /// Required configuration is absent or unusable. Never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The inbound payload is not valid base64.
    #[error("failed to decode payload base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The inbound payload could not be decompressed.
    #[error("failed to decompress payload: {0}")]
    Decompress(#[from] std::io::Error),

    /// A payload failed JSON (de)serialization.
    #[error("failed to parse payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// Transport-level delivery fault, surfaced after retries are exhausted.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The intake endpoint rejected the payload. Never retried: a rejected
    /// payload would be rejected again identically.
    #[error("intake rejected payload: status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The dead-letter queue refused an envelope. Best-effort only; the
    /// pipeline logs this and never lets it mask a delivery failure.
    #[error("dead letter enqueue failed: {0}")]
    DeadLetter(String),
}
