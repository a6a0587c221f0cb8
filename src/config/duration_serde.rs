//! Serde helpers for human-readable durations in configuration files

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

/// `Duration` as seconds (number) or a humantime string (`"45s"`, `"2m"`, `"1h30m"`)
pub mod duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration_str = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&duration_str)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str(
                    "a duration as seconds (number) or human-readable string (e.g., '45s', '2m')",
                )
            }

            fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_secs(seconds))
            }

            fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(seconds)
                    .map(Duration::from_secs)
                    .map_err(|_| de::Error::custom(format!("Negative duration: {seconds}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                humantime::parse_duration(value)
                    .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Window {
        #[serde(with = "super::duration")]
        grace: Duration,
    }

    #[test]
    fn test_parses_human_strings() {
        let window: Window = toml::from_str(r#"grace = "45s""#).unwrap();
        assert_eq!(window.grace, Duration::from_secs(45));

        let window: Window = toml::from_str(r#"grace = "2m""#).unwrap();
        assert_eq!(window.grace, Duration::from_secs(120));
    }

    #[test]
    fn test_parses_plain_seconds() {
        let window: Window = toml::from_str("grace = 30").unwrap();
        assert_eq!(window.grace, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(toml::from_str::<Window>(r#"grace = "soon""#).is_err());
        assert!(toml::from_str::<Window>("grace = -5").is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let window = Window {
            grace: Duration::from_secs(90),
        };
        let text = toml::to_string(&window).unwrap();
        assert_eq!(text.trim(), r#"grace = "1m 30s""#);
        assert_eq!(toml::from_str::<Window>(&text).unwrap(), window);
    }
}
