use serde::Deserialize;

/// Configuration for the meetings module.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeetingsConfig {
    /// IANA name of the zone whose calendar days define meeting dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,
}

impl Default for MeetingsConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            max_code_attempts: default_max_code_attempts(),
        }
    }
}

impl MeetingsConfig {
    pub fn parse_timezone(&self) -> anyhow::Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("invalid meetings timezone '{}': {e}", self.timezone))
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_max_code_attempts() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = MeetingsConfig::default();
        assert_eq!(cfg.max_code_attempts, 10);
        assert_eq!(cfg.parse_timezone().unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn timezone_must_be_known() {
        let cfg: MeetingsConfig =
            serde_json::from_value(serde_json::json!({ "timezone": "Mars/Olympus" })).unwrap();
        assert!(cfg.parse_timezone().is_err());

        let cfg: MeetingsConfig =
            serde_json::from_value(serde_json::json!({ "timezone": "America/Sao_Paulo" })).unwrap();
        assert_eq!(cfg.parse_timezone().unwrap(), chrono_tz::America::Sao_Paulo);
    }
}
