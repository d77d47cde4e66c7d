pub mod names;
pub mod reconcile;
pub mod timeline;
pub mod tree_ops;
