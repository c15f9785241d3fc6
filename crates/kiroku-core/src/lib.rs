pub mod bus;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod storage;
pub mod store;
pub mod views;
