//! Cartline server library.
//!
//! Cart, checkout and order consistency behind an Axum JSON API. The crate
//! is a library so the binary, the CLI and the integration tests share one
//! wiring of repositories, services and routes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
