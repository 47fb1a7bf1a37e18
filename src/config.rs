use std::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Max members per room, `None` for unlimited.
    pub room_capacity: Option<NonZeroUsize>,
    pub ping_interval: Duration,
    pub client_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            room_capacity: None,
            ping_interval: Duration::from_secs(15),
            client_timeout: Duration::from_secs(45),
        }
    }
}

impl Config {
    /// Reads `HOST`, `PORT`, `ROOM_CAPACITY`, `PING_INTERVAL_SECS` and
    /// `CLIENT_TIMEOUT_SECS`, after loading `.env` if there is one.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let capacity: usize = parse_or(&lookup, "ROOM_CAPACITY", 0)?;
        let ping_secs = parse_or(&lookup, "PING_INTERVAL_SECS", defaults.ping_interval.as_secs())?;
        let timeout_secs = parse_or(&lookup, "CLIENT_TIMEOUT_SECS", defaults.client_timeout.as_secs())?;
        anyhow::ensure!(ping_secs > 0, "PING_INTERVAL_SECS must be positive");
        anyhow::ensure!(timeout_secs > ping_secs, "CLIENT_TIMEOUT_SECS must exceed PING_INTERVAL_SECS");

        Ok(Self {
            host: parse_or(&lookup, "HOST", defaults.host)?,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            room_capacity: NonZeroUsize::new(capacity),
            ping_interval: Duration::from_secs(ping_secs),
            client_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("invalid {key}={raw:?}")),
        _ => Ok(default),
    }
}
