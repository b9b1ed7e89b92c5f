use crate::app::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_path: String,
    pub http_bind: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            data_path: lookup("WATER_DATA_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "./data/water_usage.csv".to_string()),
            http_bind: lookup("HTTP_BIND")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn applies_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(|_| None).expect("config should be valid");

        assert_eq!(config.data_path, "./data/water_usage.csv");
        assert_eq!(config.http_bind, "0.0.0.0:8080");
    }

    #[test]
    fn uses_provided_values_and_trims_whitespace() {
        let config = AppConfig::from_lookup(|key| match key {
            "WATER_DATA_PATH" => Some(" /var/lib/water/usage.csv ".to_string()),
            "HTTP_BIND" => Some("127.0.0.1:9090".to_string()),
            _ => None,
        })
        .expect("config should be valid");

        assert_eq!(config.data_path, "/var/lib/water/usage.csv");
        assert_eq!(config.http_bind, "127.0.0.1:9090");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(|key| match key {
            "WATER_DATA_PATH" => Some("   ".to_string()),
            _ => None,
        })
        .expect("config should be valid");

        assert_eq!(config.data_path, "./data/water_usage.csv");
    }
}
