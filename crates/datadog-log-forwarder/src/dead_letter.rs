// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Dead-letter forwarding for records the pipeline could not classify or
//! could not deliver. Best-effort: an enqueue failure is logged and never
//! masks an already-pending delivery failure.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::ForwarderError;
use crate::event::LogEvent;
use crate::extract::NormalizedRecord;

/// One item of the dead-letter envelope: either a raw event that failed
/// extraction (with its original opaque message) or a normalized record the
/// delivery client could not ship.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DeadLetterItem {
    Rejected(LogEvent),
    Undelivered(NormalizedRecord),
}

/// Boundary to the durable fallback queue. The response is not inspected.
#[async_trait]
pub trait DeadLetterQueue: Send + Sync {
    /// Enqueues one JSON-serialized envelope.
    async fn enqueue(&self, body: String) -> Result<(), ForwarderError>;
}

/// Serializes and enqueues the envelope, if non-empty. Failures are logged,
/// not raised; the caller's own error disposition stands.
pub async fn forward(queue: &dyn DeadLetterQueue, items: &[DeadLetterItem]) {
    if items.is_empty() {
        return;
    }
    let body = match serde_json::to_string(items) {
        Ok(body) => body,
        Err(err) => {
            error!("failed to serialize dead letter envelope: {err}");
            return;
        }
    };
    match queue.enqueue(body).await {
        Ok(()) => debug!(items = items.len(), "forwarded envelope to dead letter queue"),
        Err(err) => error!("failed to forward to dead letter queue: {err}"),
    }
}

/// A queue that drops envelopes, for deployments without a configured DLQ.
pub struct DiscardingQueue;

#[async_trait]
impl DeadLetterQueue for DiscardingQueue {
    async fn enqueue(&self, _body: String) -> Result<(), ForwarderError> {
        debug!("no dead letter queue configured, dropping envelope");
        Ok(())
    }
}
