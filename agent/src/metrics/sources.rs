//! Platform information sources.
//!
//! The actual radio/Wi-Fi/device lookups are platform concerns; here they
//! are traits returning opaque strings, with an environment-backed
//! implementation for headless deployments.

pub trait CellularInfoSource: Send + Sync {
    fn carrier_name(&self) -> Option<String>;
    fn mobile_network_code(&self) -> Option<String>;
    fn mobile_country_code(&self) -> Option<String>;
    fn iso_country_code(&self) -> Option<String>;
    fn network_type(&self) -> Option<String>;
}

pub trait WifiInfoSource: Send + Sync {
    fn ssid(&self) -> Option<String>;
    fn bssid(&self) -> Option<String>;
}

pub trait DeviceInfoSource: Send + Sync {
    fn os_version(&self) -> Option<String>;
    fn model(&self) -> Option<String>;
    fn manufacturer(&self) -> Option<String>;
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Reads the platform values from `AGENT_*` environment variables, with the
/// host OS/architecture as device-info fallbacks.
#[derive(Default)]
pub struct EnvInfoSource;

impl EnvInfoSource {
    pub fn new() -> Self {
        Self
    }
}

impl CellularInfoSource for EnvInfoSource {
    fn carrier_name(&self) -> Option<String> {
        env_value("AGENT_CARRIER_NAME")
    }

    fn mobile_network_code(&self) -> Option<String> {
        env_value("AGENT_MOBILE_NETWORK_CODE")
    }

    fn mobile_country_code(&self) -> Option<String> {
        env_value("AGENT_MOBILE_COUNTRY_CODE")
    }

    fn iso_country_code(&self) -> Option<String> {
        env_value("AGENT_ISO_COUNTRY_CODE")
    }

    fn network_type(&self) -> Option<String> {
        env_value("AGENT_NETWORK_TYPE")
    }
}

impl WifiInfoSource for EnvInfoSource {
    fn ssid(&self) -> Option<String> {
        env_value("AGENT_SSID")
    }

    fn bssid(&self) -> Option<String> {
        env_value("AGENT_BSSID")
    }
}

impl DeviceInfoSource for EnvInfoSource {
    fn os_version(&self) -> Option<String> {
        env_value("AGENT_OS_VERSION").or_else(|| Some(std::env::consts::OS.to_string()))
    }

    fn model(&self) -> Option<String> {
        env_value("AGENT_MODEL").or_else(|| Some(std::env::consts::ARCH.to_string()))
    }

    fn manufacturer(&self) -> Option<String> {
        env_value("AGENT_MANUFACTURER")
    }
}
