//! Command-line entrypoint and the on-disk TOML configuration it loads.
//! Recognized sections mirror the upstream Iotronic configuration file
//! verbatim: `[conductor]`, `[wamp]`, `[nginx]`.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[clap(name = "iotronic-conductor", author, version)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[clap(long, env = "IOTRONIC_CONFIG", default_value = "iotronic.toml")]
    pub config: PathBuf,

    /// Directory holding the sled database.
    #[clap(long, env = "IOTRONIC_DATA_PATH", default_value = "data")]
    pub path: PathBuf,

    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,

    #[clap(long, default_value_t = 8000)]
    pub port: u16,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(&self.config).map_err(|source| ConfigError::Read {
            path: self.config.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.config.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub conductor: ConductorSection,
    pub wamp: WampSection,
    pub nginx: NginxSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConductorSection {
    pub heartbeat_timeout: u64,
    pub service_port_min: u16,
    pub service_port_max: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WampSection {
    pub wamp_transport_url: String,
    pub wamp_realm: String,
    pub register_agent: String,
    pub auto_ping_interval: u64,
    pub auto_ping_timeout: u64,
    pub skip_cert_verify: bool,
    pub service_allow_list_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NginxSection {
    pub nginx_path: PathBuf,
    pub wstun_endpoint: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_recognized_sections() {
        let raw = r#"
            [conductor]
            heartbeat_timeout = 30
            service_port_min = 10000
            service_port_max = 20000

            [wamp]
            wamp_transport_url = "ws://localhost:8181/ws"
            wamp_realm = "s4t"
            register_agent = "iotronic-agent-1"
            auto_ping_interval = 60
            auto_ping_timeout = 30
            skip_cert_verify = false
            service_allow_list_path = "/etc/iotronic/allowed_client.json"

            [nginx]
            nginx_path = "/etc/nginx"
            wstun_endpoint = "wss://localhost:8812"
        "#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.conductor.service_port_min, 10000);
        assert_eq!(cfg.wamp.wamp_realm, "s4t");
    }
}
