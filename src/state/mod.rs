pub mod error;
pub mod graph;
pub mod machine;
pub mod mirror;
pub mod node;
