pub mod lockout;
pub mod repository;
pub mod session;
pub mod types;
