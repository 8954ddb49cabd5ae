//! Core library for station-playlist-sync
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod resolver;
pub mod session;
pub mod station;

pub use error::{Error, Result};
