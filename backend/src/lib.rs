//! Smart Home Backend Library
//!
//! Core functionality for the smart home automation service:
//! - Rule condition evaluation and the automation engine
//! - Electricity plan comparison and recommendations
//! - In-memory device, rule and plan registries
//! - Weather, natural-language rule and energy advisor integrations

pub mod api;
pub mod config;
pub mod error;
pub mod integrations;
pub mod models;
pub mod services;
pub mod store;
