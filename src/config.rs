use std::collections::HashMap;
use std::fs;
use std::io;

use serde::Deserialize;
use thiserror::Error;

use crate::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "/usr/local/etc/wake/wake.conf";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_WAIT: u64 = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read the config file '{path}'")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse the config file '{path}'")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("host '{0}' has no entry in the config file")]
    UnknownHost(String),

    #[error("host '{0}' is missing the '{1}' entry")]
    MissingEntry(String, &'static str),

    #[error("{0}")]
    Usage(&'static str),
}

/// One `[hosts.<name>]` table in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct Host {
    pub hostname: Option<String>,
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub wait: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct HostsFile {
    #[serde(default)]
    pub hosts: HashMap<String, Host>,
}

impl HostsFile {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = shellexpand::tilde(path).into_owned();
        log::debug!("using config file '{path}'");
        let raw = fs::read_to_string(&path)
            .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// The merged wake parameters: CLI flags plus, when a config file is in
/// play, the matching host entry. Flags given on the command line beat
/// file values for port and wait.
#[derive(Debug)]
pub struct Options {
    pub mac: String,
    pub ip: Option<String>,
    pub hostname: Option<String>,
    pub port: u16,
    pub wait: u64,
}

impl Options {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let config_path = if cli.use_default_config {
            Some(DEFAULT_CONFIG_FILE.to_string())
        } else {
            cli.config.clone()
        };

        match config_path {
            Some(path) => Self::from_file(cli, &path),
            None => Self::from_flags(cli),
        }
    }

    fn from_flags(cli: &Cli) -> Result<Self, ConfigError> {
        let Some(mac) = cli.mac.clone() else {
            return Err(ConfigError::Usage("the -m flag is required without a config file"));
        };
        if cli.ip.is_none() && cli.hostname.is_none() {
            return Err(ConfigError::Usage("the -m flag requires either the -i or the -H flag"));
        }

        Ok(Self {
            mac,
            ip: cli.ip.clone(),
            hostname: cli.hostname.clone(),
            port: cli.port.unwrap_or(DEFAULT_PORT),
            wait: cli.wait.unwrap_or(DEFAULT_WAIT),
        })
    }

    fn from_file(cli: &Cli, path: &str) -> Result<Self, ConfigError> {
        let Some(name) = cli.hostname.clone() else {
            return Err(ConfigError::Usage("a config file requires the -H flag"));
        };

        let file = HostsFile::load(path)?;
        let host = file
            .hosts
            .get(&name)
            .ok_or_else(|| ConfigError::UnknownHost(name.clone()))?;

        let mac = non_empty(&host.mac)
            .ok_or_else(|| ConfigError::MissingEntry(name.clone(), "mac"))?;
        let ip = non_empty(&host.ip)
            .ok_or_else(|| ConfigError::MissingEntry(name.clone(), "ip"))?;

        Ok(Self {
            mac,
            ip: Some(ip),
            // the entry's own hostname, if any, replaces the lookup name
            hostname: Some(non_empty(&host.hostname).unwrap_or(name)),
            port: cli.port.or(host.port).unwrap_or(DEFAULT_PORT),
            wait: cli.wait.or(host.wait).unwrap_or(DEFAULT_WAIT),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[hosts.mini]
mac = "aa:bb:cc:dd:ee:ff"
ip = "192.168.1.20"
port = 9

[hosts.tower]
hostname = "tower.lan"
mac = "11:22:33:44:55:66"
ip = "192.168.1.30"
wait = 5

[hosts.broken]
ip = "192.168.1.40"
"#;

    fn sample_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    fn cli_for(config: &NamedTempFile, hostname: Option<&str>) -> Cli {
        Cli {
            use_default_config: false,
            config: Some(config.path().to_string_lossy().into_owned()),
            mac: None,
            ip: None,
            hostname: hostname.map(Into::into),
            port: None,
            wait: None,
            debug: false,
        }
    }

    #[test]
    fn looks_up_host_entry() {
        let file = sample_file();
        let opts = Options::from_cli(&cli_for(&file, Some("mini"))).unwrap();

        assert_eq!(opts.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(opts.ip.as_deref(), Some("192.168.1.20"));
        assert_eq!(opts.hostname.as_deref(), Some("mini"));
        assert_eq!(opts.port, 9);
        assert_eq!(opts.wait, DEFAULT_WAIT);
    }

    #[test]
    fn entry_hostname_replaces_lookup_name() {
        let file = sample_file();
        let opts = Options::from_cli(&cli_for(&file, Some("tower"))).unwrap();

        assert_eq!(opts.hostname.as_deref(), Some("tower.lan"));
        assert_eq!(opts.port, DEFAULT_PORT);
        assert_eq!(opts.wait, 5);
    }

    #[test]
    fn cli_port_and_wait_beat_file_values() {
        let file = sample_file();
        let mut cli = cli_for(&file, Some("mini"));
        cli.port = Some(7);
        cli.wait = Some(60);

        let opts = Options::from_cli(&cli).unwrap();
        assert_eq!(opts.port, 7);
        assert_eq!(opts.wait, 60);
    }

    #[test]
    fn unknown_host_is_an_error() {
        let file = sample_file();
        assert!(matches!(
            Options::from_cli(&cli_for(&file, Some("laptop"))),
            Err(ConfigError::UnknownHost(_)),
        ));
    }

    #[test]
    fn missing_mac_entry_is_an_error() {
        let file = sample_file();
        assert!(matches!(
            Options::from_cli(&cli_for(&file, Some("broken"))),
            Err(ConfigError::MissingEntry(_, "mac")),
        ));
    }

    #[test]
    fn config_file_requires_hostname() {
        let file = sample_file();
        assert!(matches!(
            Options::from_cli(&cli_for(&file, None)),
            Err(ConfigError::Usage(_)),
        ));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let mut cli = cli_for(&sample_file(), Some("mini"));
        cli.config = Some("/nonexistent/wake.conf".into());
        assert!(matches!(Options::from_cli(&cli), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hosts = 3\n").unwrap();
        assert!(matches!(
            Options::from_cli(&cli_for(&file, Some("mini"))),
            Err(ConfigError::Parse { .. }),
        ));
    }

    #[test]
    fn direct_mode_requires_mac_and_a_target() {
        let no_mac = Cli {
            use_default_config: false,
            config: None,
            mac: None,
            ip: Some("192.168.1.20".into()),
            hostname: None,
            port: None,
            wait: None,
            debug: false,
        };
        assert!(matches!(Options::from_cli(&no_mac), Err(ConfigError::Usage(_))));

        let no_target = Cli {
            mac: Some("aa:bb:cc:dd:ee:ff".into()),
            ip: None,
            ..no_mac
        };
        assert!(matches!(Options::from_cli(&no_target), Err(ConfigError::Usage(_))));
    }

    #[test]
    fn direct_mode_applies_defaults() {
        let cli = Cli {
            use_default_config: false,
            config: None,
            mac: Some("aa:bb:cc:dd:ee:ff".into()),
            ip: Some("192.168.1.255".into()),
            hostname: None,
            port: None,
            wait: None,
            debug: false,
        };

        let opts = Options::from_cli(&cli).unwrap();
        assert_eq!(opts.port, DEFAULT_PORT);
        assert_eq!(opts.wait, DEFAULT_WAIT);
    }
}
