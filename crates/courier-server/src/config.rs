//! Server configuration, read once from the environment at start.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use courier_core::Envelope;
use courier_core::app::consumer::DEFAULT_CONSUME_THREADS;
use courier_core::app::producer::DEFAULT_SEND_TIMEOUT;
use courier_core::impls::DEFAULT_MAX_RECONSUME_TIMES;

pub const NAMESRV_ADDR_VAR: &str = "ROCKETMQ_CONSUMER_NAMESRV_ADDR";
pub const GROUP_VAR: &str = "ROCKETMQ_CONSUMER_GROUP";
pub const INSTANCE_ID_VAR: &str = "ROCKETMQ_CONSUMER_ID";

/// Where the broker lives and who we are to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Name-server endpoints, `host:port` each.
    pub namesrv_addrs: Vec<String>,
    pub group: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub broker: BrokerConfig,
    pub topic: String,
    pub tag: String,
    pub send_timeout: Duration,
    pub consume_threads: usize,
    pub max_reconsume_times: u32,
    pub http_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let namesrv = required(&lookup, NAMESRV_ADDR_VAR)?;
        let broker = BrokerConfig {
            namesrv_addrs: parse_namesrv(&namesrv)
                .with_context(|| format!("invalid {NAMESRV_ADDR_VAR}"))?,
            group: required(&lookup, GROUP_VAR)?,
            instance_id: optional(&lookup, INSTANCE_ID_VAR).unwrap_or_else(|| "DEFAULT".to_string()),
        };

        let topic = optional(&lookup, "COURIER_TOPIC").unwrap_or_else(|| "TEST_TOPIC".to_string());
        Envelope::new(topic.as_str(), Vec::new()).context("invalid COURIER_TOPIC")?;

        let consume_threads = parsed(&lookup, "COURIER_CONSUME_THREADS", DEFAULT_CONSUME_THREADS)?;
        if consume_threads == 0 {
            bail!("COURIER_CONSUME_THREADS must be at least 1");
        }

        let send_timeout_ms = parsed(
            &lookup,
            "COURIER_SEND_TIMEOUT_MS",
            DEFAULT_SEND_TIMEOUT.as_millis() as u64,
        )?;
        if send_timeout_ms == 0 {
            bail!("COURIER_SEND_TIMEOUT_MS must be positive");
        }

        Ok(Self {
            broker,
            topic,
            tag: optional(&lookup, "COURIER_TAG").unwrap_or_else(|| "tag".to_string()),
            send_timeout: Duration::from_millis(send_timeout_ms),
            consume_threads,
            max_reconsume_times: parsed(
                &lookup,
                "COURIER_MAX_RECONSUME_TIMES",
                DEFAULT_MAX_RECONSUME_TIMES,
            )?,
            http_addr: parsed(&lookup, "COURIER_HTTP_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<String> {
    match optional(lookup, name) {
        Some(value) => Ok(value),
        None => bail!("missing required environment variable {name}"),
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(lookup, name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid value {raw:?} for {name}")),
        None => Ok(default),
    }
}

/// `host:port[;host:port]...`
fn parse_namesrv(raw: &str) -> anyhow::Result<Vec<String>> {
    let mut addrs = Vec::new();
    for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((host, port)) = part.rsplit_once(':') else {
            bail!("{part:?} is not host:port");
        };
        if host.is_empty() {
            bail!("{part:?} has an empty host");
        }
        port.parse::<u16>()
            .with_context(|| format!("{part:?} has an invalid port"))?;
        addrs.push(part.to_string());
    }
    if addrs.is_empty() {
        bail!("no name-server address given");
    }
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            (NAMESRV_ADDR_VAR, "127.0.0.1:9876"),
            (GROUP_VAR, "courier-group"),
        ]
    }

    #[test]
    fn defaults_apply() {
        let config = ServerConfig::from_lookup(lookup_from(&minimal())).unwrap();

        assert_eq!(config.broker.namesrv_addrs, vec!["127.0.0.1:9876".to_string()]);
        assert_eq!(config.broker.group, "courier-group");
        assert_eq!(config.broker.instance_id, "DEFAULT");
        assert_eq!(config.topic, "TEST_TOPIC");
        assert_eq!(config.tag, "tag");
        assert_eq!(config.send_timeout, Duration::from_secs(3));
        assert_eq!(config.consume_threads, 20);
        assert_eq!(config.max_reconsume_times, 16);
        assert_eq!(config.http_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = minimal();
        vars.extend([
            (NAMESRV_ADDR_VAR, "ns-a:9876; ns-b:9876"),
            (INSTANCE_ID_VAR, "node-7"),
            ("COURIER_TOPIC", "ORDERS"),
            ("COURIER_TAG", "created"),
            ("COURIER_SEND_TIMEOUT_MS", "500"),
            ("COURIER_CONSUME_THREADS", "4"),
            ("COURIER_MAX_RECONSUME_TIMES", "3"),
            ("COURIER_HTTP_ADDR", "127.0.0.1:9000"),
        ]);
        let config = ServerConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.broker.namesrv_addrs, vec!["ns-a:9876", "ns-b:9876"]);
        assert_eq!(config.broker.instance_id, "node-7");
        assert_eq!(config.topic, "ORDERS");
        assert_eq!(config.tag, "created");
        assert_eq!(config.send_timeout, Duration::from_millis(500));
        assert_eq!(config.consume_threads, 4);
        assert_eq!(config.max_reconsume_times, 3);
        assert_eq!(config.http_addr.port(), 9000);
    }

    #[test]
    fn missing_group_is_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[(NAMESRV_ADDR_VAR, "ns:9876")])).unwrap_err();
        assert!(err.to_string().contains(GROUP_VAR));
    }

    #[test]
    fn blank_namesrv_is_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[(NAMESRV_ADDR_VAR, "  "), (GROUP_VAR, "g")]))
            .unwrap_err();
        assert!(err.to_string().contains(NAMESRV_ADDR_VAR));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (name, value) in [
            (NAMESRV_ADDR_VAR, "no-port"),
            (NAMESRV_ADDR_VAR, "host:99999"),
            ("COURIER_TOPIC", "bad topic"),
            ("COURIER_CONSUME_THREADS", "0"),
            ("COURIER_CONSUME_THREADS", "many"),
            ("COURIER_SEND_TIMEOUT_MS", "0"),
            ("COURIER_HTTP_ADDR", "localhost"),
        ] {
            let mut vars = minimal();
            vars.push((name, value));
            assert!(
                ServerConfig::from_lookup(lookup_from(&vars)).is_err(),
                "{name}={value} should be rejected"
            );
        }
    }
}
