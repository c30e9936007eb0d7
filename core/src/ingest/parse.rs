use std::collections::BTreeSet;

use percent_encoding::percent_decode_str;
use url::{Host, Url};

use crate::error::IngestError;

use super::finding::{Finding, FindingSet, Link, Severity, SourceLocation};
use super::model::{RuleSet, Violation};

/// Where kantra mounts the analyzed input inside its container.
pub const CONTAINER_INPUT_ROOT: &str = "/opt/input/source";

pub fn parse_output(text: &str, inputs: &BTreeSet<String>) -> Result<FindingSet, IngestError> {
    if text.trim().is_empty() {
        return Ok(FindingSet::default());
    }
    let rulesets: Vec<RuleSet> = serde_yaml::from_str(text)?;

    let mut findings = Vec::new();
    for ruleset in &rulesets {
        for (rule_id, rule_errors) in &ruleset.errors {
            tracing::warn!(ruleset = %ruleset.name, rule = %rule_id, error = %rule_errors, "rule failed");
        }
        for (rule_id, violation) in &ruleset.violations {
            let severity = Severity::from_category(violation.category.as_deref());
            collect(&mut findings, ruleset, rule_id, violation, severity, inputs);
        }
        for (rule_id, insight) in &ruleset.insights {
            collect(&mut findings, ruleset, rule_id, insight, Severity::Info, inputs);
        }
    }
    Ok(FindingSet::new(findings))
}

fn collect(
    out: &mut Vec<Finding>,
    ruleset: &RuleSet,
    rule_id: &str,
    violation: &Violation,
    severity: Severity,
    inputs: &BTreeSet<String>,
) {
    let links: Vec<Link> = violation
        .links
        .iter()
        .map(|l| Link {
            url: l.url.clone(),
            title: l.title.clone(),
        })
        .collect();

    for incident in &violation.incidents {
        out.push(Finding {
            location: SourceLocation {
                file: resolve_uri(&incident.uri, inputs),
                line: incident.line_number,
            },
            ruleset: ruleset.name.clone(),
            rule_id: rule_id.to_string(),
            severity,
            category: violation.category.clone(),
            title: violation.description.clone(),
            message: incident.message.trim().to_string(),
            effort: violation.effort,
            code_snip: incident.code_snip.clone(),
            labels: violation.labels.clone(),
            links: links.clone(),
        });
    }
}

/// Turns an incident URI into a host path.
///
/// Paths under the container mount are rebased onto the input when there is exactly one.
pub fn resolve_uri(uri: &str, inputs: &BTreeSet<String>) -> String {
    let path = uri_path(uri);
    if inputs.len() != 1 {
        return path;
    }
    let Some(input) = inputs.iter().next() else {
        return path;
    };
    match path.strip_prefix(CONTAINER_INPUT_ROOT) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            format!("{}{}", input.trim_end_matches('/'), rest)
        }
        _ => path,
    }
}

// Container paths are POSIX whatever the host is, so the URL path is decoded as-is
// rather than through `Url::to_file_path`.
fn uri_path(uri: &str) -> String {
    let url = match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url,
        _ => return uri.to_string(),
    };
    match url.host() {
        None | Some(Host::Domain("localhost")) => {
            percent_decode_str(url.path()).decode_utf8_lossy().into_owned()
        }
        Some(_) => uri.to_string(),
    }
}
