// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! AWS-backed implementations of the pipeline's collaborator traits.

use async_trait::async_trait;
use tracing::debug;

use crate::alias::AliasLookup;
use crate::dead_letter::DeadLetterQueue;
use crate::error::ForwarderError;

/// Resolves aliases through the Lambda `ListAliases` API, filtered to the
/// exact revision.
pub struct LambdaAliasLookup {
    client: aws_sdk_lambda::Client,
}

impl LambdaAliasLookup {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_lambda::Client::new(&config))
    }
}

#[async_trait]
impl AliasLookup for LambdaAliasLookup {
    async fn list_aliases(
        &self,
        unit: &str,
        revision: &str,
    ) -> Result<Vec<String>, ForwarderError> {
        debug!(unit, revision, "listing aliases for revision");
        let output = self
            .client
            .list_aliases()
            .function_name(unit)
            .function_version(revision)
            .send()
            .await
            .map_err(|err| {
                // Typically missing or insufficient AWS credentials.
                ForwarderError::Configuration(format!(
                    "alias lookup for {unit}:{revision} failed, check AWS credentials: {err}"
                ))
            })?;
        Ok(output
            .aliases()
            .iter()
            .filter_map(|alias| alias.name().map(str::to_string))
            .collect())
    }
}

/// Dead-letter queue backed by SQS `SendMessage`.
pub struct SqsDeadLetterQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsDeadLetterQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    pub async fn from_env(queue_url: String) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sqs::Client::new(&config), queue_url)
    }
}

#[async_trait]
impl DeadLetterQueue for SqsDeadLetterQueue {
    async fn enqueue(&self, body: String) -> Result<(), ForwarderError> {
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|err| ForwarderError::DeadLetter(err.to_string()))?;
        Ok(())
    }
}
