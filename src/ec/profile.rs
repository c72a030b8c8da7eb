//! Erasure Code Profile
//!
//! The host hands every backend a string-keyed profile. This backend is
//! fixed-shape, so the profile is validated rather than interpreted: `k`
//! and `m` must be present and match the built-in layout exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::layout::{CODING_CHUNKS, DATA_CHUNKS};
use crate::error::{Error, Result};

/// Default CRUSH root for generated rules
pub const DEFAULT_RULE_ROOT: &str = "default";

/// Default failure domain for generated rules
pub const DEFAULT_FAILURE_DOMAIN: &str = "host";

/// String-keyed erasure code profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(BTreeMap<String, String>);

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile carrying the layout this backend requires.
    pub fn fixed() -> Self {
        let mut profile = Self::new();
        profile.set("k", DATA_CHUNKS.to_string());
        profile.set("m", CODING_CHUNKS.to_string());
        profile
    }

    /// Parse `key=value` pairs separated by commas or whitespace.
    pub fn parse(text: &str) -> Result<Self> {
        let mut profile = Self::new();
        for pair in text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::Configuration(format!("profile entry '{}' is not key=value", pair))
            })?;
            profile.set(key.trim(), value.trim());
        }
        Ok(profile)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check `k` and `m` against the fixed layout.
    pub fn validate(&self) -> Result<()> {
        let k = self.required_count("k")?;
        let m = self.required_count("m")?;

        if k != DATA_CHUNKS || m != CODING_CHUNKS {
            return Err(Error::Configuration(format!(
                "requires k={} and m={}, got k={} and m={}",
                DATA_CHUNKS, CODING_CHUNKS, k, m
            )));
        }
        Ok(())
    }

    /// CRUSH root used for rule creation.
    pub fn rule_root(&self) -> &str {
        self.get("crush-root").unwrap_or(DEFAULT_RULE_ROOT)
    }

    /// Failure domain used for rule creation.
    pub fn failure_domain(&self) -> &str {
        self.get("crush-failure-domain")
            .unwrap_or(DEFAULT_FAILURE_DOMAIN)
    }

    fn required_count(&self, key: &str) -> Result<usize> {
        let raw = self
            .get(key)
            .ok_or_else(|| Error::Configuration("requires k and m parameters".into()))?;
        raw.trim().parse().map_err(|_| {
            Error::Configuration(format!("{} must be an integer, got '{}'", key, raw))
        })
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", pairs.join(","))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Profile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
