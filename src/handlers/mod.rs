// handlers/mod.rs - two handler tiers
//
// Public (no auth) → Protected (bearer JWT, /api/*)
pub mod public;
pub mod protected;
