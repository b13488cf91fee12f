pub mod password;
pub mod repo;
pub mod types;
