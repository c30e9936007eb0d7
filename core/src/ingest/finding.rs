use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Konveyor categories: `mandatory`, `optional`, `potential`.
    pub fn from_category(category: Option<&str>) -> Self {
        match category.map(str::trim) {
            Some(c) if c.eq_ignore_ascii_case("mandatory") => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub title: String,
}

/// One issue reported by the analyzer at one source location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub location: SourceLocation,
    pub ruleset: String,
    pub rule_id: String,
    pub severity: Severity,
    pub category: Option<String>,
    pub title: String,
    pub message: String,
    pub effort: Option<u32>,
    pub code_snip: Option<String>,
    pub labels: Vec<String>,
    pub links: Vec<Link>,
}

/// Findings of one run, sorted by location and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSet {
    findings: Vec<Finding>,
}

impl FindingSet {
    pub fn new(mut findings: Vec<Finding>) -> Self {
        findings.sort();
        findings.dedup();
        Self { findings }
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }

    pub fn by_location(&self) -> BTreeMap<&SourceLocation, Vec<&Finding>> {
        let mut out: BTreeMap<&SourceLocation, Vec<&Finding>> = BTreeMap::new();
        for f in &self.findings {
            out.entry(&f.location).or_default().push(f);
        }
        out
    }

    pub fn by_file(&self) -> BTreeMap<&str, Vec<&Finding>> {
        let mut out: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
        for f in &self.findings {
            out.entry(f.location.file.as_str()).or_default().push(f);
        }
        out
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn total_effort(&self) -> u64 {
        self.findings
            .iter()
            .map(|f| u64::from(f.effort.unwrap_or(0)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(file: &str, line: u32, rule: &str) -> Finding {
        Finding {
            location: SourceLocation {
                file: file.into(),
                line: Some(line),
            },
            ruleset: "rs".into(),
            rule_id: rule.into(),
            severity: Severity::Warning,
            category: Some("optional".into()),
            title: "t".into(),
            message: "m".into(),
            effort: Some(1),
            code_snip: None,
            labels: vec![],
            links: vec![],
        }
    }

    #[test]
    fn set_sorts_and_dedups() {
        let set = FindingSet::new(vec![
            finding("b.java", 3, "r1"),
            finding("a.java", 9, "r1"),
            finding("b.java", 3, "r1"),
            finding("a.java", 2, "r2"),
        ]);
        assert_eq!(set.len(), 3);
        let order: Vec<_> = set
            .iter()
            .map(|f| (f.location.file.as_str(), f.location.line))
            .collect();
        assert_eq!(
            order,
            vec![("a.java", Some(2)), ("a.java", Some(9)), ("b.java", Some(3))]
        );
        assert_eq!(set.by_file().len(), 2);
        assert_eq!(set.by_location().len(), 3);
        assert_eq!(set.total_effort(), 3);
    }

    #[test]
    fn severity_from_category() {
        assert_eq!(Severity::from_category(Some("mandatory")), Severity::Error);
        assert_eq!(Severity::from_category(Some("optional")), Severity::Warning);
        assert_eq!(Severity::from_category(Some("potential")), Severity::Warning);
        assert_eq!(Severity::from_category(None), Severity::Warning);
    }
}
