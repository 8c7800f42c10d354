pub mod node;
pub mod project;
