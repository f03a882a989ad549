use std::io;
use std::net::{IpAddr, ToSocketAddrs};

use thiserror::Error;

use crate::config::Options;
use crate::net::Destination;
use crate::packet::{MacAddress, MacParseError};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Mac(#[from] MacParseError),

    #[error("'{0}' is not a valid IPv4 or IPv6 address")]
    InvalidIp(String),

    #[error("unable to resolve host '{host}'")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("host '{0}' did not resolve to any address")]
    NoAddress(String),

    #[error("either an IP address or a hostname is required")]
    MissingTarget,
}

/// A wake request with all inputs validated: who to wake, where to send
/// the packet, and how long to wait afterwards.
#[derive(Debug)]
pub struct Target {
    pub mac: MacAddress,
    pub destination: Destination,
    pub hostname: Option<String>,
    pub wait: u64,
}

pub fn resolve(opts: &Options) -> Result<Target, ResolveError> {
    let mac: MacAddress = opts.mac.parse()?;

    let ip = match (&opts.ip, &opts.hostname) {
        (Some(text), _) => parse_ip(text)?,
        (None, Some(host)) => {
            let ip = resolve_host(host)?;
            log::debug!("resolved '{host}' to {ip}");
            ip
        }
        (None, None) => return Err(ResolveError::MissingTarget),
    };

    Ok(Target {
        mac,
        destination: Destination::new(ip, opts.port),
        hostname: opts.hostname.clone(),
        wait: opts.wait,
    })
}

pub fn parse_ip(text: &str) -> Result<IpAddr, ResolveError> {
    text.parse()
        .map_err(|_| ResolveError::InvalidIp(text.to_string()))
}

/// Resolves through the system resolver, preferring IPv4 over IPv6.
/// An empty result set is an error, not a panic.
pub fn resolve_host(host: &str) -> Result<IpAddr, ResolveError> {
    let addrs: Vec<IpAddr> = (host, 0)
        .to_socket_addrs()
        .map_err(|e| ResolveError::Lookup { host: host.to_string(), source: e })?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ResolveError::NoAddress(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(ip: Option<&str>, hostname: Option<&str>) -> Options {
        Options {
            mac: "aa:bb:cc:dd:ee:ff".into(),
            ip: ip.map(Into::into),
            hostname: hostname.map(Into::into),
            port: 80,
            wait: 20,
        }
    }

    #[test]
    fn classifies_ip_family() {
        let v4 = parse_ip("192.168.1.255").unwrap();
        let v6 = parse_ip("fe80::1").unwrap();
        assert!(v4.is_ipv4());
        assert!(v6.is_ipv6());
        assert!(parse_ip("192.168.1.999").is_err());
        assert!(parse_ip("not-an-ip").is_err());
    }

    #[test]
    fn explicit_ip_wins_over_hostname() {
        let target = resolve(&options(Some("10.0.0.255"), Some("office-pc"))).unwrap();
        assert_eq!(target.destination.ip.to_string(), "10.0.0.255");
        assert_eq!(target.hostname.as_deref(), Some("office-pc"));
    }

    #[test]
    fn invalid_mac_is_rejected() {
        let mut opts = options(Some("10.0.0.255"), None);
        opts.mac = "not-a-mac".into();
        assert!(matches!(resolve(&opts), Err(ResolveError::Mac(_))));
    }

    #[test]
    fn neither_ip_nor_hostname_is_rejected() {
        assert!(matches!(
            resolve(&options(None, None)),
            Err(ResolveError::MissingTarget),
        ));
    }

    #[test]
    fn numeric_host_resolves() {
        assert_eq!(
            resolve_host("127.0.0.1").unwrap(),
            IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
        );
    }

    #[test]
    fn unresolvable_host_is_an_error() {
        assert!(resolve_host("host.does-not-exist.invalid").is_err());
    }
}
