//! HTTP route handlers.

pub mod auth;
pub mod health;
pub mod issues;
pub mod me;
pub mod pages;
pub mod permissions;
pub mod workspaces;
