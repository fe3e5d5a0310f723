// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The pipeline orchestrator: decode, resolve identity, extract, filter,
//! deliver, and dead-letter whatever could not be classified or shipped.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::alias::{
    function_path, revision_from_stream, unit_identity, AliasCache, AliasLookup, AliasResolver,
};
use crate::aws::{LambdaAliasLookup, SqsDeadLetterQueue};
use crate::config::ForwarderConfig;
use crate::dead_letter::{self, DeadLetterItem, DeadLetterQueue, DiscardingQueue};
use crate::error::ForwarderError;
use crate::event::{decode_payload, LogEvent};
use crate::extract::{extract, NormalizedRecord};
use crate::intake::{BatchContext, IntakeClient, RetryPolicy};

/// What one invocation accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardOutcome {
    /// Lines that failed extraction and were forwarded to the dead letter
    /// queue.
    pub rejected: usize,
    /// Records delivered to the intake endpoint.
    pub sent: usize,
}

/// Drives one payload through the full pipeline.
pub struct Forwarder {
    config: ForwarderConfig,
    resolver: AliasResolver,
    intake: IntakeClient,
    dead_letter: Arc<dyn DeadLetterQueue>,
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Forwarder {
    /// Builds a forwarder, refusing unusable configuration before any
    /// payload is accepted.
    pub fn new(
        config: ForwarderConfig,
        lookup: Arc<dyn AliasLookup>,
        cache: Arc<AliasCache>,
        dead_letter: Arc<dyn DeadLetterQueue>,
    ) -> Result<Self, ForwarderError> {
        Self::with_retry(config, lookup, cache, dead_letter, RetryPolicy::default())
    }

    pub fn with_retry(
        config: ForwarderConfig,
        lookup: Arc<dyn AliasLookup>,
        cache: Arc<AliasCache>,
        dead_letter: Arc<dyn DeadLetterQueue>,
        retry: RetryPolicy,
    ) -> Result<Self, ForwarderError> {
        config.validate()?;
        let intake = IntakeClient::with_retry(&config, retry)?;
        Ok(Self {
            resolver: AliasResolver::new(lookup, cache),
            intake,
            dead_letter,
            config,
        })
    }

    /// Builds a production forwarder from the environment: configuration
    /// from `DD_*` variables, AWS-backed collaborators, and a fresh alias
    /// cache owned by this instance.
    pub async fn from_env() -> Result<Self, ForwarderError> {
        let config = ForwarderConfig::from_env()?;
        let lookup = Arc::new(LambdaAliasLookup::from_env().await);
        let dead_letter: Arc<dyn DeadLetterQueue> = match config.dead_letter_queue_url.clone() {
            Some(url) => Arc::new(SqsDeadLetterQueue::from_env(url).await),
            None => Arc::new(DiscardingQueue),
        };
        Self::new(config, lookup, Arc::new(AliasCache::new()), dead_letter)
    }

    /// Processes one invocation payload end to end.
    ///
    /// Per-line extraction failures never abort the invocation; they are
    /// forwarded to the dead-letter queue alongside, on delivery failure,
    /// every record that was about to be sent. Delivery errors are returned
    /// only after that forwarding attempt completes.
    pub async fn process(&self, payload: &Value) -> Result<ForwardOutcome, ForwarderError> {
        let Some(batch) = decode_payload(payload)? else {
            debug!("empty payload, nothing to forward");
            return Ok(ForwardOutcome::default());
        };

        let unit = unit_identity(&batch.log_group).to_string();
        let revision = revision_from_stream(&batch.log_stream);
        let resolution = self.resolver.resolve(&unit, &revision).await?;
        let context = BatchContext {
            function_path: function_path(&unit, &revision, &resolution),
            log_stream: batch.log_stream.clone(),
            version_tag: resolution.delivery_tag(),
        };

        let mut accepted: Vec<NormalizedRecord> = Vec::new();
        let mut rejected: Vec<LogEvent> = Vec::new();
        for event in batch.log_events {
            match extract(event) {
                Ok(record) => accepted.push(record),
                Err(failure) => rejected.push(failure.event),
            }
        }

        let extracted = accepted.len();
        let survivors: Vec<NormalizedRecord> = accepted
            .into_iter()
            .filter(|record| record.severity.passes(self.config.threshold))
            .collect();
        let filtered = extracted - survivors.len();
        let surviving = survivors.len();
        let rejected_count = rejected.len();
        debug!(
            function = %context.function_path,
            extracted,
            filtered,
            surviving,
            rejected = rejected_count,
            "batch partitioned"
        );

        match self.intake.deliver(&context, &survivors).await {
            Ok(()) => {
                let items: Vec<DeadLetterItem> =
                    rejected.into_iter().map(DeadLetterItem::Rejected).collect();
                dead_letter::forward(self.dead_letter.as_ref(), &items).await;
                Ok(ForwardOutcome {
                    rejected: rejected_count,
                    sent: survivors.len(),
                })
            }
            Err(err) => {
                // Forward everything that was about to be sent before the
                // delivery error propagates.
                let mut items: Vec<DeadLetterItem> =
                    rejected.into_iter().map(DeadLetterItem::Rejected).collect();
                items.extend(survivors.into_iter().map(DeadLetterItem::Undelivered));
                dead_letter::forward(self.dead_letter.as_ref(), &items).await;
                Err(err)
            }
        }
    }
}
