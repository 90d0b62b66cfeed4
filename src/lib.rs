//! Forecast quiz backend: participants predict percentages, the admin drives the rounds,
//! and every client follows along over server-sent events.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
