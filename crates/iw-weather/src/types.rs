use serde::{Deserialize, Serialize};

/// Size of a condition string on the wire and in storage, including the
/// terminator the watch firmware reserves.
pub const CONDITIONS_BUFFER_SIZE: usize = 32;

/// Display categories derived from OpenWeatherMap condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCategory {
    #[default]
    Generic,
    HeavyRain,
    LightRain,
    Snow,
    PartlyCloudy,
    Sunny,
}

impl ConditionCategory {
    /// Every category, in declaration order.
    pub const ALL: [ConditionCategory; 6] = [
        Self::Generic,
        Self::HeavyRain,
        Self::LightRain,
        Self::Snow,
        Self::PartlyCloudy,
        Self::Sunny,
    ];

    /// Classify an OpenWeatherMap condition code.
    /// See: https://openweathermap.org/weather-conditions
    ///
    /// Thunderstorms (2xx) and anything below share the heavy-rain icon.
    pub fn classify(code: i32) -> Self {
        match code {
            i32::MIN..=299 => Self::HeavyRain,
            300..=399 => Self::LightRain,
            500..=599 => Self::HeavyRain,
            600..=699 => Self::Snow,
            700..=799 => Self::Generic,
            800 => Self::Sunny,
            801..=899 => Self::PartlyCloudy,
            _ => Self::Generic,
        }
    }

    /// Icon resource name for this category
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Generic => "generic_weather",
            Self::HeavyRain => "heavy_rain",
            Self::LightRain => "light_rain",
            Self::Snow => "light_snow",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Sunny => "sun",
        }
    }
}

/// Free-function form of [`ConditionCategory::classify`].
pub fn classify(code: i32) -> ConditionCategory {
    ConditionCategory::classify(code)
}

/// The last known weather at the user's location.
///
/// Fields are read through accessors so `category` always matches
/// `condition_code` and the text always fits a condition buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReadingFields")]
pub struct WeatherReading {
    temperature: i32,
    condition_code: i32,
    category: ConditionCategory,
    condition_text: String,
}

/// Wire form; the category is always rederived.
#[derive(Deserialize)]
struct ReadingFields {
    temperature: i32,
    condition_code: i32,
    condition_text: String,
}

impl From<ReadingFields> for WeatherReading {
    fn from(fields: ReadingFields) -> Self {
        Self::new(fields.temperature, fields.condition_code, fields.condition_text)
    }
}

impl WeatherReading {
    pub fn new(temperature: i32, condition_code: i32, condition_text: impl Into<String>) -> Self {
        Self {
            temperature,
            condition_code,
            category: ConditionCategory::classify(condition_code),
            condition_text: bounded_text(&condition_text.into()),
        }
    }

    /// Whole degrees Celsius
    pub fn temperature(&self) -> i32 {
        self.temperature
    }

    pub fn condition_code(&self) -> i32 {
        self.condition_code
    }

    pub fn category(&self) -> ConditionCategory {
        self.category
    }

    pub fn condition_text(&self) -> &str {
        &self.condition_text
    }
}

/// Truncate `text` to fit a condition buffer without splitting a character.
pub fn bounded_text(text: &str) -> String {
    truncate_to(text, CONDITIONS_BUFFER_SIZE - 1)
}

pub(crate) fn truncate_to(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_documented_scenarios() {
        assert_eq!(classify(800), ConditionCategory::Sunny);
        assert_eq!(classify(250), ConditionCategory::HeavyRain);
        assert_eq!(classify(350), ConditionCategory::LightRain);
        assert_eq!(classify(999), ConditionCategory::Generic);
    }

    #[test]
    fn test_classify_range_edges() {
        assert_eq!(classify(299), ConditionCategory::HeavyRain);
        assert_eq!(classify(300), ConditionCategory::LightRain);
        assert_eq!(classify(399), ConditionCategory::LightRain);
        assert_eq!(classify(400), ConditionCategory::Generic);
        assert_eq!(classify(500), ConditionCategory::HeavyRain);
        assert_eq!(classify(599), ConditionCategory::HeavyRain);
        assert_eq!(classify(600), ConditionCategory::Snow);
        assert_eq!(classify(699), ConditionCategory::Snow);
        assert_eq!(classify(701), ConditionCategory::Generic);
        assert_eq!(classify(801), ConditionCategory::PartlyCloudy);
        assert_eq!(classify(899), ConditionCategory::PartlyCloudy);
        assert_eq!(classify(900), ConditionCategory::Generic);
    }

    #[test]
    fn test_classify_is_total() {
        let samples = [i32::MIN, -1, 0, 450, 1000, i32::MAX];
        for code in samples {
            assert!(ConditionCategory::ALL.contains(&classify(code)));
        }
        for code in -1000..2000 {
            assert!(ConditionCategory::ALL.contains(&classify(code)));
        }
    }

    #[test]
    fn test_reading_derives_category() {
        let reading = WeatherReading::new(55, 501, "Rain");
        assert_eq!(reading.category(), ConditionCategory::HeavyRain);
        assert_eq!(reading.condition_text(), "Rain");
    }

    #[test]
    fn test_condition_text_is_bounded() {
        let long = "x".repeat(64);
        let reading = WeatherReading::new(1, 800, long);
        assert_eq!(reading.condition_text().len(), CONDITIONS_BUFFER_SIZE - 1);
    }

    #[test]
    fn test_deserialized_reading_rederives_category() {
        let json = r#"{"temperature": 4, "condition_code": 601, "category": "sunny", "condition_text": "Snow"}"#;
        let reading: WeatherReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading, WeatherReading::new(4, 601, "Snow"));
        assert_eq!(reading.category(), ConditionCategory::Snow);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 16 two-byte characters = 32 bytes
        let text = "é".repeat(16);
        let bounded = bounded_text(&text);
        assert_eq!(bounded.len(), 30);
        assert!(bounded.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_icon_names() {
        assert_eq!(ConditionCategory::Sunny.icon_name(), "sun");
        assert_eq!(ConditionCategory::Generic.icon_name(), "generic_weather");
    }
}
