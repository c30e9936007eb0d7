use super::configuration::{Configuration, OptionPair};

pub const OPTION_OVERWRITE: &str = "overwrite";
pub const OPTION_ANALYZE_KNOWN_LIBRARIES: &str = "analyze-known-libraries";
pub const OPTION_RULES: &str = "rules";
pub const OPTION_TARGET: &str = "target";
pub const OPTION_SOURCE: &str = "source";

/// The option list of a [`Configuration`] split into the options kantra understands.
///
/// Empty `sources`/`targets` stay empty: no default technology is ever filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub overwrite: bool,
    pub analyze_known_libraries: bool,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    pub rules: Vec<String>,
    /// Unrecognized options, forwarded as `--key value` in their original order.
    pub passthrough: Vec<OptionPair>,
}

impl AnalysisOptions {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        let mut out = Self {
            overwrite: configuration.option_flag(OPTION_OVERWRITE),
            analyze_known_libraries: configuration.option_flag(OPTION_ANALYZE_KNOWN_LIBRARIES),
            ..Self::default()
        };

        for pair in &configuration.options {
            match pair.key.as_str() {
                OPTION_SOURCE => out.sources.push(pair.value.clone()),
                OPTION_TARGET => out.targets.push(pair.value.clone()),
                OPTION_RULES => out.rules.push(pair.value.clone()),
                OPTION_OVERWRITE | OPTION_ANALYZE_KNOWN_LIBRARIES => {}
                _ => out.passthrough.push(pair.clone()),
            }
        }
        out
    }
}
