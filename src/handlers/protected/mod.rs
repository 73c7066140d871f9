// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: bearer token validation, AuthUser injected into extensions
pub mod students;
