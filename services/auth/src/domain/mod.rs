pub mod audit;
pub mod repository;
pub mod types;
