// Authentication handlers
pub mod auth;

// User management handlers
pub mod users;

// Maintenance handlers
pub mod maintenance;
