//! Общие контракты между backend и клиентами API EcoDeli:
//! агрегаты, статусы, DTO запросов и ответов.

pub mod domain;
pub mod shared;
pub mod system;
