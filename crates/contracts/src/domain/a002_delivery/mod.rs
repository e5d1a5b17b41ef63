pub mod aggregate;
pub mod status;
