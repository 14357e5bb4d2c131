//! Newsroom - role-based news publishing
//!
//! Readers follow publishers and journalists, journalists write articles and
//! newsletters, editors approve them. Approval notifies subscribers by email
//! and posts once to an external social feed.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod web;
