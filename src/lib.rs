//! Emberlock: voice + iris two-factor device unlock
//!
//! The binary in `main.rs` wires these modules to scripted collaborators;
//! platform integrations implement the traits in [`capture`], [`device`]
//! and [`auth::fallback`] and drive an [`service::AuthService`].

pub mod auth;
pub mod biometrics;
pub mod capture;
pub mod config;
pub mod device;
pub mod paths;
pub mod service;
pub mod validation;
