//! HTTP service exposing the tournament scheduling engine.

pub mod api;
pub mod config;
pub mod logging;
