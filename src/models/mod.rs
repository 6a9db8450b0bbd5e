pub mod audit;
pub mod circuit_breaker;
pub mod event;
pub mod health;
pub mod notification;
pub mod rate_limit;
pub mod response;
pub mod retry;
