//! Controller configuration
//!
//! All knobs are read from the environment in `main` with sane defaults, so
//! the binary runs unconfigured against a dev cluster. The ingress template
//! is fully parameterized here rather than hard-coded in the resolver.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::resources::IngressTemplate;

/// Number of parallel reconcile workers when `INGRESS_OPERATOR_WORKERS` is unset
pub const DEFAULT_WORKERS: usize = 2;

/// Base delay for the first rate-limited requeue
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Cap on the rate-limited requeue delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(300);

/// Runtime configuration for the controller
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of parallel reconcile workers
    pub workers: usize,
    /// Shape of the Ingresses this controller creates
    pub template: IngressTemplate,
    /// Base delay for rate-limited requeues
    pub base_delay: Duration,
    /// Maximum delay for rate-limited requeues
    pub max_delay: Duration,
    /// Bind address for the health/metrics server
    pub health_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            template: IngressTemplate::default(),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            health_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for unset or unparseable variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let template = IngressTemplate {
            host: env_string("INGRESS_OPERATOR_HOST", defaults.template.host),
            ingress_class: env_string("INGRESS_OPERATOR_CLASS", defaults.template.ingress_class),
            path: env_string("INGRESS_OPERATOR_PATH", defaults.template.path),
            default_backend_port: env_parse(
                "INGRESS_OPERATOR_DEFAULT_PORT",
                defaults.template.default_backend_port,
            ),
        };

        Self {
            workers: env_parse("INGRESS_OPERATOR_WORKERS", defaults.workers).max(1),
            template,
            base_delay: Duration::from_millis(env_parse(
                "INGRESS_OPERATOR_BASE_DELAY_MS",
                defaults.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_secs(env_parse(
                "INGRESS_OPERATOR_MAX_DELAY_SECS",
                defaults.max_delay.as_secs(),
            )),
            health_addr: env_string("INGRESS_OPERATOR_HEALTH_ADDR", defaults.health_addr),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Err(_) => default,
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("invalid value {:?} for {}: {}, using default", raw, key, e);
                default
            }
        },
    }
}
