pub mod kantra;

pub use kantra::KantraRunnerPlugin;
