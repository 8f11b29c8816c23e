//! Weather data for SkyCast
//!
//! Fetches Visual Crossing timeline payloads, keeps a per-city file cache,
//! and derives facts (weekly average, extremal days) from a payload.

pub mod cache;
pub mod facts;
pub mod provider;
pub mod service;
pub mod types;

pub use cache::WeatherCache;
pub use provider::WeatherProvider;
pub use service::WeatherService;
pub use types::*;
