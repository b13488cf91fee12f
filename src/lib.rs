pub mod accounts;
pub mod app;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod state;
pub mod storage;
pub mod submissions;
