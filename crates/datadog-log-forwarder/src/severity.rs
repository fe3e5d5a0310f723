// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The ordered severity scale shared by extraction, filtering, and delivery.

use serde::Serialize;

/// Log severities in ascending order. The derived `Ord` is the filtering
/// order: a record passes a threshold when its severity is not below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Trace,
    Silly,
    Debug,
    Verbose,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Parses a scale value, case-insensitively. Returns `None` for tokens
    /// outside the recognized scale.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Some(Self::Trace),
            "SILLY" => Some(Self::Silly),
            "DEBUG" => Some(Self::Debug),
            "VERBOSE" => Some(Self::Verbose),
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Silly => "SILLY",
            Self::Debug => "DEBUG",
            Self::Verbose => "VERBOSE",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Whether a record at this severity is eligible for delivery at the
    /// given threshold. Records strictly below the threshold are dropped
    /// silently; this is intentional filtering, not failure.
    pub fn passes(&self, threshold: Severity) -> bool {
        *self >= threshold
    }
}
