//! Renders stored multi-language blog posts into presentation-ready HTML.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
