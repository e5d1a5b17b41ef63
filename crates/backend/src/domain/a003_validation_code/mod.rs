//! Коды подтверждения доставки: выпуск курьером, погашение клиентом,
//! очистка просроченных.

pub mod cleanup;
pub mod confirmer;
pub mod generator;
pub mod issuer;
pub mod repository;
