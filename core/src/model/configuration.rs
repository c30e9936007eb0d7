use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file or directory handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLocation {
    pub location: String,
}

impl InputLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionPair {
    pub key: String,
    pub value: String,
}

impl OptionPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses `key=value`; a bare `key` means `key=true`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Some(Self::new(k.trim(), v.trim())),
            Some(_) => None,
            None => Some(Self::new(raw, "true")),
        }
    }
}

/// A named analysis job: what to analyze, where results go, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<InputLocation>,
    pub output_location: PathBuf,
    #[serde(default)]
    pub options: Vec<OptionPair>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Configuration {
    pub fn new(name: impl Into<String>, output_location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            output_location: output_location.into(),
            options: Vec::new(),
            timestamp: None,
        }
    }

    pub fn with_input(mut self, location: impl Into<String>) -> Self {
        self.inputs.push(InputLocation::new(location));
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(OptionPair::new(key, value));
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_location
    }

    /// Distinct input locations in a stable order.
    pub fn input_paths(&self) -> BTreeSet<String> {
        self.inputs
            .iter()
            .map(|i| i.location.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn has_inputs(&self) -> bool {
        !self.input_paths().is_empty()
    }

    pub fn options_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.options
            .iter()
            .filter(move |p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// First occurrence decides, absent means false.
    pub fn option_flag(&self, key: &str) -> bool {
        self.options_for(key).next().map(parse_flag).unwrap_or(false)
    }

    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.timestamp = Some(now);
    }
}

/// `true` in any letter case; everything else, padded values included, is false.
pub fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}
