//! `vaultmirror` HTTP server.
//!
//! Wires the secret store, the config cache, and its refresh loop into an
//! Axum server. Serves the admin secrets API at `/api/v2/admin/*`, the public
//! config endpoint at `/api/v2/public/config`, and system routes at
//! `/api/v2/sys/*`.

pub mod config;
pub mod error;
pub mod hardening;
pub mod routes;
pub mod state;
