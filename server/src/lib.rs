//! Key-bound metadata server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod mirror;
pub mod routes;
pub mod state;
