//! Shape of the `output.yaml` document kantra writes into the output directory.
use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSet {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub violations: BTreeMap<String, Violation>,
    pub insights: BTreeMap<String, Violation>,
    pub errors: BTreeMap<String, String>,
    pub unmatched: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Violation {
    pub description: String,
    pub category: Option<String>,
    pub labels: Vec<String>,
    pub incidents: Vec<Incident>,
    pub links: Vec<RuleLink>,
    pub effort: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Incident {
    pub uri: String,
    pub message: String,
    pub code_snip: Option<String>,
    pub line_number: Option<u32>,
    pub variables: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleLink {
    pub url: String,
    pub title: String,
}
