use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_session_idle_hours")]
    pub session_idle_hours: i64,
}

fn default_session_idle_hours() -> i64 {
    24
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    /// Base URL of the payout REST API, without a trailing slash.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
}

fn default_api_base_url() -> String {
    "http://localhost:4000".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint (e.g. http://tempo:4317). Spans are not exported when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("cannot read current directory: {e}")))?;

    // Run from the workspace root or from inside the crate
    let configuration_directory = if base_path.ends_with("payout-dashboard") {
        base_path.join("config")
    } else {
        base_path.join("payout-dashboard").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_section_is_optional() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(
                "server:\n  host: 127.0.0.1\n  port: 3000\napi:\n  base_url: http://api\n",
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.telemetry.log_level, "info");
        assert!(settings.telemetry.otlp_endpoint.is_none());
        assert_eq!(settings.server.session_idle_hours, 24);
        assert!(!settings.server.secure_cookies);
    }
}
