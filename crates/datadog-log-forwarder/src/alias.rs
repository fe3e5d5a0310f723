// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Revision-to-alias resolution with process-wide memoization.
//!
//! A deployed unit's numeric revision maps to the human-assigned names bound
//! to it: a short `vN` alias and/or an underscored semantic version. The pair
//! is immutable for the lifetime of a revision, so results (including empty
//! ones) are cached per `(unit, revision)` and never expire in-process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ForwarderError;

/// Marker for the unversioned/latest revision; no lookup is performed for it.
pub const LATEST_MARKER: &str = "$LATEST";

lazy_static! {
    #[allow(clippy::expect_used)]
    static ref SHORT_ALIAS: Regex = Regex::new(r"^v\d+$").expect("failed creating regex");
    #[allow(clippy::expect_used)]
    static ref VERSION_TAG: Regex = Regex::new(r"^\d+_\d+_\d+$").expect("failed creating regex");
    #[allow(clippy::expect_used)]
    static ref REVISION_MARKER: Regex =
        Regex::new(r"\[(\$LATEST|\d+)\]").expect("failed creating regex");
}

/// The names resolved for one `(unit, revision)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasResolution {
    /// A `v<integer>` alias, verbatim.
    pub short_alias: Option<String>,
    /// A `<major>_<minor>_<patch>` alias rewritten to dotted form.
    pub version_tag: Option<String>,
}

impl AliasResolution {
    /// The `version:<dotted>` delivery tag, when a version alias resolved.
    pub fn delivery_tag(&self) -> Option<String> {
        self.version_tag.as_ref().map(|tag| format!("version:{tag}"))
    }
}

/// Memoization table keyed by `(unit, revision)`.
///
/// Constructed at process startup and injected into the resolver; never
/// ambient global state, so tests build fresh instances per case. A lost
/// insert race re-stores an identical value, never a torn one.
#[derive(Debug, Default)]
pub struct AliasCache {
    entries: Mutex<HashMap<(String, String), AliasResolution>>,
}

impl AliasCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, unit: &str, revision: &str) -> Option<AliasResolution> {
        let entries = self.entries.lock().ok()?;
        entries.get(&(unit.to_string(), revision.to_string())).cloned()
    }

    fn insert(&self, unit: &str, revision: &str, resolution: AliasResolution) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert((unit.to_string(), revision.to_string()), resolution);
        }
    }
}

/// Boundary to the remote alias-lookup service.
#[async_trait]
pub trait AliasLookup: Send + Sync {
    /// Lists the alias names bound to exactly this revision of the unit.
    /// Order is not meaningful.
    async fn list_aliases(&self, unit: &str, revision: &str)
        -> Result<Vec<String>, ForwarderError>;
}

/// Resolves revisions to aliases through the injected lookup, memoizing
/// through the injected cache.
pub struct AliasResolver {
    lookup: Arc<dyn AliasLookup>,
    cache: Arc<AliasCache>,
}

impl AliasResolver {
    pub fn new(lookup: Arc<dyn AliasLookup>, cache: Arc<AliasCache>) -> Self {
        Self { lookup, cache }
    }

    /// Resolves the aliases for `(unit, revision)`.
    ///
    /// The `$LATEST` marker short-circuits to an empty resolution with no
    /// lookup and no cache write. Empty lookup results are memoized too, so
    /// a unit with no aliases is not re-queried every invocation. Lookup
    /// failures are configuration-class and propagate unretried.
    pub async fn resolve(
        &self,
        unit: &str,
        revision: &str,
    ) -> Result<AliasResolution, ForwarderError> {
        if revision == LATEST_MARKER {
            return Ok(AliasResolution::default());
        }
        if let Some(hit) = self.cache.get(unit, revision) {
            return Ok(hit);
        }

        let names = self.lookup.list_aliases(unit, revision).await?;
        let mut resolution = AliasResolution::default();
        for name in names {
            if SHORT_ALIAS.is_match(&name) {
                resolution.short_alias = Some(name);
            } else if VERSION_TAG.is_match(&name) {
                resolution.version_tag = Some(name.replace('_', "."));
            }
        }

        self.cache.insert(unit, revision, resolution.clone());
        Ok(resolution)
    }
}

/// Derives the unit identity from a log-group name: the final path segment.
pub fn unit_identity(log_group: &str) -> &str {
    log_group.rsplit('/').next().unwrap_or(log_group)
}

/// Extracts the revision embedded in a log-stream name, e.g.
/// `2024/01/01/[663]abcdef` yields `663`. A stream without a bracketed
/// marker is treated as `$LATEST`.
pub fn revision_from_stream(log_stream: &str) -> String {
    REVISION_MARKER
        .captures(log_stream)
        .map(|captures| captures[1].to_string())
        .unwrap_or_else(|| LATEST_MARKER.to_string())
}

/// Builds the human-readable path for a unit at a revision: double-dash
/// segment separators become path separators, then the short alias, else the
/// dotted version tag, else the revision itself (numeric or the `$LATEST`
/// marker verbatim) is appended.
pub fn function_path(unit: &str, revision: &str, resolution: &AliasResolution) -> String {
    let component = resolution
        .short_alias
        .as_deref()
        .or(resolution.version_tag.as_deref())
        .unwrap_or(revision);
    format!("/{}/{}", unit.replace("--", "/"), component)
}
