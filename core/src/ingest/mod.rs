mod finding;
pub mod model;
mod parse;
mod pipeline;
mod store;

pub use finding::{Finding, FindingSet, Link, Severity, SourceLocation};
pub use parse::{parse_output, resolve_uri, CONTAINER_INPUT_ROOT};
pub use pipeline::{ResultIngestionPipeline, OUTPUT_FILE};
pub use store::{FindingStore, MemoryFindingStore};
