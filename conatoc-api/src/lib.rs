//! # CONATOC Net Portal Server Library
//!
//! HTTP session layer over `conatoc-shared`: resolves the current actor
//! for each request, calls the core and maps its errors to responses.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
