pub mod api;
pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod ingest;
pub mod launch;
pub mod launcher;
pub mod model;
pub mod runner;
pub mod util;
