//! SafraReport - editorial backend for a Dominican news site
//!
//! Drafting, review and publication of newsroom articles, with version
//! history, editorial comments and an audit trail.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
