pub mod catalog;
pub mod models;
pub mod service;
pub mod store;
pub mod transfer;
