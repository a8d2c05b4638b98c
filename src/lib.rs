//! Parking Tariff Engine
//!
//! This crate computes the minimal legal fee for a parking session under a
//! tariff of time-scoped metering rates and optional price caps, and serves
//! that computation over HTTP.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
