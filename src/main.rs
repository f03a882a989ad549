use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

mod config;
mod net;
mod packet;
mod resolve;

use crate::config::Options;
use crate::packet::MagicPacket;

/// Send a Wake-on-LAN magic packet to power on a remote computer.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Use the default config file /usr/local/etc/wake/wake.conf
    #[arg(short = 'C', long = "default", conflicts_with = "config")]
    pub use_default_config: bool,

    /// Config file with the [hosts.<name>] tables
    #[arg(short, long)]
    pub config: Option<String>,

    /// MAC address of the computer, not valid with a config file
    #[arg(short, long, conflicts_with_all = ["config", "use_default_config"])]
    pub mac: Option<String>,

    /// IP address of the computer, not valid with a config file
    #[arg(short, long, conflicts_with_all = ["config", "use_default_config"])]
    pub ip: Option<String>,

    /// Hostname of the computer, required with a config file
    #[arg(short = 'H', long = "host")]
    pub hostname: Option<String>,

    /// Port to send the wake-up packet to [default: 80]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seconds to wait for the computer to wake up [default: 20]
    #[arg(short, long)]
    pub wait: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(if cli.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .init()?;

    let opts = Options::from_cli(&cli)?;
    let target = resolve::resolve(&opts)?;

    log::debug!("MAC  : {}", target.mac);
    log::debug!("IP   : {}", target.destination.ip);
    log::debug!("port : {}", target.destination.port);
    if let Some(name) = &target.hostname {
        log::debug!("host : {name}");
    }

    let packet = MagicPacket::new(target.mac);
    log::info!("sending the wake-up packet over {}", target.destination.family());
    net::send(&packet, target.destination)
        .with_context(|| format!("unable to wake {}", target.destination.ip))?;

    countdown(target.wait, "waiting for the computer to wake up");

    match &target.hostname {
        Some(name) => log::info!(
            "{} (IP {}, MAC {}) should be awake now",
            name, target.destination.ip, target.mac,
        ),
        None => log::info!(
            "the computer at {} (MAC {}) should be awake now",
            target.destination.ip, target.mac,
        ),
    }

    Ok(())
}

/// Ticks the remaining seconds down on a single console line.
fn countdown(secs: u64, msg: &str) {
    let mut out = std::io::stdout();
    for left in (1..=secs).rev() {
        print!("\r{msg} ({left}s) ");
        let _ = out.flush();
        thread::sleep(Duration::from_secs(1));
    }
    if secs > 0 {
        print!("\r\x1b[2K");
        let _ = out.flush();
    }
}
