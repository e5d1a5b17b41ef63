pub mod a001_announcement;
pub mod a002_delivery;
pub mod a003_validation_code;
pub mod a004_payment;
pub mod a005_notification;
