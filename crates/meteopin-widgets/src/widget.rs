use std::fmt;

use chrono::{DateTime, Utc};
use meteopin_core::ValidationError;
use meteopin_weather::WeatherSnapshot;
use serde::{Deserialize, Serialize};

pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Creation-time based widget identifier (epoch millis)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(i64);

impl WidgetId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if Self::is_valid(latitude, longitude) {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(ValidationError::invalid(latitude, longitude))
        }
    }

    /// Parse raw form input. Surrounding whitespace is ignored.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid(latitude.trim(), longitude.trim());
        let lat: f64 = latitude.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = longitude.trim().parse().map_err(|_| invalid())?;
        Self::new(lat, lon).map_err(|_| invalid())
    }

    pub fn is_valid(latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && LATITUDE_RANGE.contains(&latitude)
            && LONGITUDE_RANGE.contains(&longitude)
    }

    /// True when both axes differ by less than `tolerance` degrees.
    pub fn is_near(&self, latitude: f64, longitude: f64, tolerance: f64) -> bool {
        (self.latitude - latitude).abs() < tolerance && (self.longitude - longitude).abs() < tolerance
    }
}

/// Weather data together with the moment it was fetched.
///
/// Keeping both in one value means a widget can never carry data without a
/// timestamp or a timestamp without data.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub snapshot: WeatherSnapshot,
    pub updated_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(snapshot: WeatherSnapshot, updated_at: DateTime<Utc>) -> Self {
        Self {
            snapshot,
            updated_at,
        }
    }
}

/// A pinned coordinate and its weather state
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    id: WidgetId,
    coordinate: Coordinate,
    reading: Option<Reading>,
}

impl Widget {
    /// New widgets start unresolved (no reading yet).
    pub fn new(id: WidgetId, coordinate: Coordinate) -> Self {
        Self {
            id,
            coordinate,
            reading: None,
        }
    }

    pub(crate) fn with_reading(mut self, reading: Option<Reading>) -> Self {
        self.reading = reading;
        self
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.reading.as_ref()
    }

    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.reading.as_ref().map(|r| &r.snapshot)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.reading.as_ref().map(|r| r.updated_at)
    }

    /// Still waiting for its first (or a refreshed) reading
    pub fn is_loading(&self) -> bool {
        self.reading.is_none()
    }

    pub(crate) fn set_reading(&mut self, reading: Option<Reading>) {
        self.reading = reading;
    }
}
