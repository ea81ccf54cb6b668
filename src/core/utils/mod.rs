/// Common utility functions
pub mod common;
