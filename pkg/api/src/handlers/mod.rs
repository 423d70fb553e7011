pub mod namespaces;
pub mod resources;
