//! Weather provider for Meteopin
//!
//! Fetches current conditions for a coordinate from the Open-Meteo API and
//! maps WMO condition codes to a description and icon category.

pub mod provider;
pub mod types;

pub use provider::{WeatherProvider, WeatherSource};
pub use types::*;
