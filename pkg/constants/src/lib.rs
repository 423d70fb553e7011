//! Centralized constants for the k3rs quota engine.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod paths;
pub mod quota;
pub mod state;
