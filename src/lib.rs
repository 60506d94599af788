//! OAuth-authenticated watchlist service.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod openapi;
pub mod session;
pub mod state;
pub mod watchlists;
