pub mod config;
pub mod drop;
pub mod node;
pub mod timeline;
pub mod workspace;

pub use config::*;
pub use drop::*;
pub use node::*;
pub use timeline::*;
pub use workspace::*;
