//! Smol, self-hosted URL shortener with click analytics.
//!
//! linklet does three things from one binary: mints short slugs for
//! target URLs, redirects visitors while recording the click, and
//! aggregates recorded clicks into a per-link summary (daily trend,
//! top referrers, device mix).

pub mod analytics;
pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod redirect;
pub mod state;
pub mod ua;
