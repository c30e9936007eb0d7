pub mod factory;
pub mod markers;
pub mod report;
pub mod runner;
pub mod server;
pub mod store;
