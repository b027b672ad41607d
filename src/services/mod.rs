pub mod booking;
pub mod checkout;
pub mod circuit_breaker;
pub mod cleanup;
pub mod payment;
pub mod pricing;
