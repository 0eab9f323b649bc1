// This file acts as the entry point for the `backend` library.
// Declaring the modules here makes them available to other crates,
// like our integration tests.
pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod session;
pub mod web_server;
