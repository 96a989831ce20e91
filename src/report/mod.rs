//! Cell table output.

pub mod generator;

pub use generator::*;
