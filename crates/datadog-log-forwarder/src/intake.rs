// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of normalized records to the logs intake endpoint.
//!
//! A batch is serialized to the intake wire shape, gzip-compressed, and
//! posted once per attempt. Transport faults are retried with exponential
//! backoff; a non-2xx response is terminal because a rejected payload would
//! be rejected again identically.

use std::io::Write;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, error};

use crate::config::ForwarderConfig;
use crate::error::ForwarderError;
use crate::extract::NormalizedRecord;

const LOGS_ENDPOINT: &str = "/api/v2/logs";
const API_KEY_HEADER: &str = "DD-API-KEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-invocation identity attached to every delivered record.
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// Human-readable unit path, e.g. `/my-service/prod/v4`.
    pub function_path: String,
    pub log_stream: String,
    /// `version:<dotted>` when a version alias resolved for the revision.
    pub version_tag: Option<String>,
}

/// One entry of the intake payload array.
#[derive(Debug, Serialize)]
struct IntakeEntry {
    timestamp: i64,
    /// JSON-stringified [`IntakeDetail`].
    message: String,
    level: &'static str,
    service: String,
    ddsource: &'static str,
    hostname: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ddtags: Option<String>,
}

#[derive(Debug, Serialize)]
struct IntakeDetail<'a> {
    inv: IntakeInvocation<'a>,
    message: &'a str,
    /// The original level token, lower-cased, even outside the scale.
    level: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a str>,
    #[serde(rename = "logStream")]
    log_stream: &'a str,
}

#[derive(Debug, Serialize)]
struct IntakeInvocation<'a> {
    #[serde(rename = "invocationId")]
    invocation_id: &'a str,
    #[serde(rename = "functionName")]
    function_name: &'a str,
}

/// Retry bound and backoff schedule for transport faults.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt after `attempt` failed ones: the base
    /// delay doubling per attempt (1s, 2s, 4s, ...).
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Outcome of a single post, classified for the retry loop.
enum Attempt {
    Delivered,
    Retry(reqwest::Error),
    Fail(ForwarderError),
}

/// Client for the logs intake endpoint.
pub struct IntakeClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl IntakeClient {
    pub fn new(config: &ForwarderConfig) -> Result<Self, ForwarderError> {
        Self::with_retry(config, RetryPolicy::default())
    }

    pub fn with_retry(
        config: &ForwarderConfig,
        retry: RetryPolicy,
    ) -> Result<Self, ForwarderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry,
        })
    }

    /// Delivers a batch of records, or raises a terminal delivery error.
    ///
    /// An empty batch returns immediately with no network call. The caller
    /// decides what happens to the records on failure.
    pub async fn deliver(
        &self,
        context: &BatchContext,
        records: &[NormalizedRecord],
    ) -> Result<(), ForwarderError> {
        if records.is_empty() {
            return Ok(());
        }

        let entries = build_entries(context, records)?;
        let body = serde_json::to_vec(&entries)?;
        let compressed = compress(&body)?;
        let url = format!("{}{}", self.api_url, LOGS_ENDPOINT);
        debug!(
            records = records.len(),
            bytes = compressed.len(),
            "posting batch to logs intake"
        );

        let mut attempt = 1;
        loop {
            match self.post(&url, compressed.clone()).await {
                Attempt::Delivered => {
                    debug!(records = records.len(), "batch delivered");
                    return Ok(());
                }
                Attempt::Retry(err) if attempt < self.retry.max_attempts => {
                    let wait = self.retry.delay(attempt);
                    let wait_ms = wait.as_millis() as u64;
                    debug!(
                        attempt,
                        wait_ms,
                        "transport error posting to intake, will retry: {err}"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Attempt::Retry(err) => {
                    error!(attempt, "giving up posting to intake: {err}");
                    return Err(ForwarderError::Transport(err));
                }
                Attempt::Fail(err) => return Err(err),
            }
        }
    }

    async fn post(&self, url: &str, body: Vec<u8>) -> Attempt {
        let response = match self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_ENCODING, "gzip")
            .header(API_KEY_HEADER, &self.api_key)
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Attempt::Retry(err),
        };

        let status = response.status();
        if status.is_success() {
            return Attempt::Delivered;
        }
        let body = response.text().await.unwrap_or_default();
        error!("{status}: intake rejected payload: {body}");
        Attempt::Fail(ForwarderError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn build_entries(
    context: &BatchContext,
    records: &[NormalizedRecord],
) -> Result<Vec<IntakeEntry>, ForwarderError> {
    records
        .iter()
        .map(|record| {
            let detail = IntakeDetail {
                inv: IntakeInvocation {
                    invocation_id: &record.correlation_id,
                    function_name: &context.function_path,
                },
                message: &record.message,
                level: &record.raw_level,
                timestamp: record.origin_timestamp.as_deref(),
                log_stream: &context.log_stream,
            };
            Ok(IntakeEntry {
                timestamp: record.delivery_timestamp,
                message: serde_json::to_string(&detail)?,
                level: record.severity.as_str(),
                service: context.function_path.clone(),
                ddsource: "aws-lambda",
                hostname: "lambda",
                ddtags: context.version_tag.clone(),
            })
        })
        .collect()
}

fn compress(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use mockito::Server;

    fn context() -> BatchContext {
        BatchContext {
            function_path: "/my-service/prod/v4".to_string(),
            log_stream: "2024/01/01/[663]abc".to_string(),
            version_tag: Some("version:4.3.47".to_string()),
        }
    }

    fn record(message: &str) -> NormalizedRecord {
        NormalizedRecord {
            severity: Severity::Error,
            raw_level: "error".to_string(),
            message: message.to_string(),
            correlation_id: "req-42".to_string(),
            origin_timestamp: Some("2024-01-01T00:00:00Z".to_string()),
            delivery_timestamp: 1_700_000_000_000,
        }
    }

    fn client(url: &str) -> IntakeClient {
        let config = ForwarderConfig {
            api_key: "test-key".to_string(),
            api_url: url.to_string(),
            threshold: Severity::Info,
            dead_letter_queue_url: None,
        };
        IntakeClient::with_retry(
            &config,
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        )
        .unwrap()
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
    }

    #[test]
    fn entries_follow_the_intake_wire_shape() {
        let entries = build_entries(&context(), &[record("boom")]).unwrap();
        assert_eq!(entries.len(), 1);
        let wire = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(wire["timestamp"], 1_700_000_000_000_i64);
        assert_eq!(wire["level"], "ERROR");
        assert_eq!(wire["service"], "/my-service/prod/v4");
        assert_eq!(wire["ddsource"], "aws-lambda");
        assert_eq!(wire["hostname"], "lambda");
        assert_eq!(wire["ddtags"], "version:4.3.47");

        let detail: serde_json::Value =
            serde_json::from_str(wire["message"].as_str().unwrap()).unwrap();
        assert_eq!(detail["inv"]["invocationId"], "req-42");
        assert_eq!(detail["inv"]["functionName"], "/my-service/prod/v4");
        assert_eq!(detail["message"], "boom");
        assert_eq!(detail["level"], "error");
        assert_eq!(detail["timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(detail["logStream"], "2024/01/01/[663]abc");
    }

    #[test]
    fn ddtags_is_omitted_without_a_version_tag() {
        let context = BatchContext {
            version_tag: None,
            ..context()
        };
        let entries = build_entries(&context, &[record("boom")]).unwrap();
        let wire = serde_json::to_value(&entries[0]).unwrap();
        assert!(wire.get("ddtags").is_none());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", LOGS_ENDPOINT).expect(0).create_async().await;
        let client = client(&server.url());
        client.deliver(&context(), &[]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn transport_errors_surface_after_retries_are_exhausted() {
        // Nothing listens on the discard port, so every attempt fails at the
        // transport layer.
        let client = client("http://127.0.0.1:9");
        let error = client
            .deliver(&context(), &[record("boom")])
            .await
            .unwrap_err();
        assert!(matches!(error, ForwarderError::Transport(_)));
    }

    #[tokio::test]
    async fn posts_gzip_json_with_api_key_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", LOGS_ENDPOINT)
            .match_header("DD-API-KEY", "test-key")
            .match_header("content-type", "application/json")
            .match_header("content-encoding", "gzip")
            .with_status(202)
            .create_async()
            .await;

        let client = client(&server.url());
        client.deliver(&context(), &[record("boom")]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_is_terminal_and_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", LOGS_ENDPOINT)
            .with_status(403)
            .with_body("that went wrong")
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url());
        let error = client
            .deliver(&context(), &[record("boom")])
            .await
            .unwrap_err();
        match error {
            ForwarderError::Rejected { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "that went wrong");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        mock.assert_async().await;
    }
}
