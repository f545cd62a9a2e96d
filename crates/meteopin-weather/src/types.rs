use serde::{Deserialize, Serialize};

/// Icon categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconCategory {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    LightRain,
    Rain,
    Snow,
    Thunderstorm,
    /// Fallback for codes outside the table
    Wind,
}

impl IconCategory {
    /// Icon asset shown on the widget card
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Clear => "clear.png",
            Self::PartlyCloudy => "partly_cloudy.png",
            Self::Cloudy => "cloudy.png",
            Self::Fog => "fog.png",
            Self::LightRain => "light_rain.png",
            Self::Rain => "rain.png",
            Self::Snow => "snow.png",
            Self::Thunderstorm => "thunderstorm.png",
            Self::Wind => "wind.png",
        }
    }
}

/// Description and icon for one condition code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionInfo {
    pub description: &'static str,
    pub icon: IconCategory,
}

/// Entry used for any code the table does not know
pub const UNKNOWN_CONDITION: ConditionInfo = ConditionInfo {
    description: "Unknown",
    icon: IconCategory::Wind,
};

impl ConditionInfo {
    const fn new(description: &'static str, icon: IconCategory) -> Self {
        Self { description, icon }
    }

    /// Convert a WMO weather code to its description and icon.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        use IconCategory::*;

        match code {
            0 => Self::new("Clear", Clear),
            1 => Self::new("Mainly clear", Clear),
            2 => Self::new("Partly cloudy", PartlyCloudy),
            3 => Self::new("Overcast", Cloudy),
            45 => Self::new("Fog", Fog),
            48 => Self::new("Depositing rime fog", Fog),
            51 => Self::new("Light drizzle", LightRain),
            61 => Self::new("Slight rain", LightRain),
            63 => Self::new("Moderate rain", Rain),
            71 => Self::new("Slight snow", Snow),
            73 => Self::new("Moderate snow", Snow),
            75 => Self::new("Heavy snow", Snow),
            82 => Self::new("Violent rain showers", Rain),
            85 => Self::new("Slight snow showers", Snow),
            86 => Self::new("Heavy snow showers", Snow),
            95 => Self::new("Thunderstorm", Thunderstorm),
            96 => Self::new("Thunderstorm with slight hail", Thunderstorm),
            99 => Self::new("Thunderstorm with heavy hail", Thunderstorm),
            _ => UNKNOWN_CONDITION,
        }
    }
}

/// Current conditions at one coordinate, as of one fetch.
///
/// Field names follow the persisted widget format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Degrees Celsius, rounded
    pub temperature: i32,
    pub description: String,
    /// Relative humidity, percent
    pub humidity: i32,
    /// Metres per second
    pub wind_speed: f64,
    pub icon: IconCategory,
}

impl WeatherSnapshot {
    /// Build a snapshot from raw readings and a condition code
    pub fn from_readings(temperature: f64, humidity: i32, wind_speed: f64, code: i32) -> Self {
        Self::from_condition(temperature, humidity, wind_speed, ConditionInfo::from_wmo_code(code))
    }

    /// Build a snapshot from raw readings and an already resolved condition.
    ///
    /// Halves round towards positive infinity, so -2.5 becomes -2.
    pub fn from_condition(
        temperature: f64,
        humidity: i32,
        wind_speed: f64,
        info: ConditionInfo,
    ) -> Self {
        Self {
            temperature: (temperature + 0.5).floor() as i32,
            description: info.description.to_string(),
            humidity,
            wind_speed,
            icon: info.icon,
        }
    }
}
