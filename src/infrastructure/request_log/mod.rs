//! Request audit log infrastructure

mod postgres;
mod repository;
mod service;

pub use postgres::PostgresRequestLogRepository;
pub use repository::InMemoryRequestLogRepository;
pub use service::RequestLogService;
