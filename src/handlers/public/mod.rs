// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service banner and health probe.
pub mod home;

pub use home::*;
