/// Middleware modules for the portal server
///
/// Actor resolution lives in `conatoc_shared::auth::middleware`; this crate
/// adds the response-side layers.

pub mod security;
