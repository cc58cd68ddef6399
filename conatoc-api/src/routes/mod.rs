/// API route handlers, organized by resource
///
/// Handlers take the resolved `Actor` from the request extensions and pass
/// it to the core; they never check roles themselves.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod directory;
pub mod health;
pub mod library;
pub mod news;
pub mod overview;
pub mod uploads;
