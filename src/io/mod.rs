pub mod config_io;
pub mod file_ops;
pub mod host;
pub mod lock;
pub mod recovery;
pub mod state;
pub mod watcher;
pub mod workspace_io;
