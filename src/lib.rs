pub mod access;
pub mod api;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod models;
pub mod session;
