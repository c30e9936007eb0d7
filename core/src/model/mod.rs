mod configuration;
mod options;

pub use configuration::{parse_flag, Configuration, InputLocation, OptionPair};
pub use options::{
    AnalysisOptions, OPTION_ANALYZE_KNOWN_LIBRARIES, OPTION_OVERWRITE, OPTION_RULES,
    OPTION_SOURCE, OPTION_TARGET,
};
