//! SheldonNews - A mock technology news page
//!
//! This crate serves a single news page with synthetic trending posts, a
//! light/dark theme toggle, per-post likes, a newsletter signup and a cookie
//! notice. Each page load mounts its own view state on the server.

pub mod config;
pub mod provider;
pub mod routes;
pub mod store;
pub mod view;
