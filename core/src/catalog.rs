//! Static description of the options kantra accepts.
//!
//! The catalog is versionless: it describes the option surface this crate knows how to
//! translate, not whichever kantra release happens to be installed.
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::LaunchError;
use crate::model::{
    parse_flag, Configuration, OPTION_ANALYZE_KNOWN_LIBRARIES, OPTION_OVERWRITE, OPTION_RULES,
    OPTION_SOURCE, OPTION_TARGET,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionType {
    Boolean,
    File,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UiType {
    Single,
    FileOrDirectory,
    SelectMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub value_type: OptionType,
    pub ui_type: UiType,
    /// Sorted; empty for free-form options.
    pub available_options: Vec<&'static str>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionIssue {
    pub key: String,
    pub value: String,
    pub reason: String,
}

const TARGETS: &[&str] = &[
    "azure", "camel3", "camel4", "cloud", "drools", "eap", "eap6", "eap7", "eap8", "eapxp",
    "fsw", "fuse", "hibernate", "jakarta", "java", "jbpm", "jws6", "linux", "openjdk",
    "openjdk11", "openjdk17", "openjdk21", "openliberty", "quarkus", "resteasy", "rhr",
];

const SOURCES: &[&str] = &[
    "agroal", "amazon", "apicurio", "artemis", "avro", "camel", "config", "drools", "eap",
    "eap6", "eap7", "eap8", "eapxp", "elytron", "flyway", "glassfish", "hibernate",
    "hibernate-search", "jakarta-ee", "java-ee", "jbpm", "jboss", "javaee", "jdbs", "jonas",
    "jrun", "jsonb", "jsonp", "kafka", "keycloak", "kubernetes", "liquibase", "log4j",
    "logging", "micrometer", "narayana", "openjdk", "openjdk11", "openshift", "opentelemetry",
    "oraclejdk", "orion", "picocli", "resin", "resteasy", "rmi", "rpc", "seam", "soa",
    "spring", "spring-boot", "thorntail", "weblogic", "websphere",
];

fn sorted(values: &[&'static str]) -> Vec<&'static str> {
    let mut v = values.to_vec();
    v.sort_unstable();
    v
}

pub fn catalog() -> &'static [OptionDescription] {
    static CATALOG: OnceLock<Vec<OptionDescription>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        vec![
            OptionDescription {
                name: OPTION_OVERWRITE,
                description: "If set, overwrite the output directory.",
                value_type: OptionType::Boolean,
                ui_type: UiType::Single,
                available_options: Vec::new(),
                required: false,
            },
            OptionDescription {
                name: OPTION_ANALYZE_KNOWN_LIBRARIES,
                description: "Analyze known open-source libraries.",
                value_type: OptionType::Boolean,
                ui_type: UiType::Single,
                available_options: Vec::new(),
                required: false,
            },
            OptionDescription {
                name: OPTION_RULES,
                description: "User Rules Directory/File.",
                value_type: OptionType::File,
                ui_type: UiType::FileOrDirectory,
                available_options: Vec::new(),
                required: false,
            },
            OptionDescription {
                name: OPTION_TARGET,
                description: "The target technology to consider for analysis.",
                value_type: OptionType::String,
                ui_type: UiType::SelectMany,
                available_options: sorted(TARGETS),
                required: true,
            },
            OptionDescription {
                name: OPTION_SOURCE,
                description: "The source technology to consider for analysis.",
                value_type: OptionType::String,
                ui_type: UiType::SelectMany,
                available_options: sorted(SOURCES),
                required: false,
            },
        ]
    })
}

pub fn find(name: &str) -> Option<&'static OptionDescription> {
    catalog().iter().find(|o| o.name == name)
}

/// Soft checks against the catalog. Nothing reported here blocks a launch.
pub fn validate(configuration: &Configuration) -> Vec<OptionIssue> {
    let mut issues = Vec::new();
    for pair in &configuration.options {
        let Some(desc) = find(&pair.key) else {
            continue;
        };
        match desc.value_type {
            OptionType::Boolean => {
                let v = pair.value.trim();
                if !parse_flag(v) && !v.eq_ignore_ascii_case("false") {
                    issues.push(OptionIssue {
                        key: pair.key.clone(),
                        value: pair.value.clone(),
                        reason: "not a boolean, treated as false".to_string(),
                    });
                }
            }
            OptionType::File => {
                if pair.value.trim().is_empty() {
                    issues.push(OptionIssue {
                        key: pair.key.clone(),
                        value: pair.value.clone(),
                        reason: "empty path".to_string(),
                    });
                }
            }
            OptionType::String => {
                if !desc.available_options.is_empty()
                    && !desc.available_options.contains(&pair.value.as_str())
                {
                    issues.push(OptionIssue {
                        key: pair.key.clone(),
                        value: pair.value.clone(),
                        reason: format!("unknown {}", desc.name),
                    });
                }
            }
        }
    }
    issues
}

/// Unrecognized keys become `--key` flags, so they must look like one.
pub fn check_passthrough_key(key: &str) -> Result<(), LaunchError> {
    static KEY_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = KEY_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap());
    if re.is_match(key) {
        Ok(())
    } else {
        Err(LaunchError::InvalidOption {
            key: key.to_string(),
            reason: "option names may only contain lowercase letters, digits and '-'".to_string(),
        })
    }
}
