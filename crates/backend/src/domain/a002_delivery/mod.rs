pub mod log_repository;
pub mod repository;
pub mod service;
