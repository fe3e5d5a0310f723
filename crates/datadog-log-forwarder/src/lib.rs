// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards CloudWatch subscription log batches to the Datadog logs intake.
//!
//! The pipeline decodes an aggregator payload, resolves the function's
//! revision to a human-readable alias, normalizes every line, filters by
//! severity, and delivers the survivors with bounded retry. Lines that could
//! not be classified, and records that could not be delivered, are forwarded
//! to a dead-letter queue rather than dropped.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod alias;
pub mod aws;
pub mod config;
pub mod dead_letter;
pub mod error;
pub mod event;
pub mod extract;
pub mod forwarder;
pub mod intake;
pub mod severity;

pub use config::ForwarderConfig;
pub use error::ForwarderError;
pub use forwarder::{ForwardOutcome, Forwarder};
