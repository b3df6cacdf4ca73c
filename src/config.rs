use serde::Deserialize;
use std::sync::Arc;

use crate::console::ConsoleListener;
use crate::error::ConfigError;
use crate::policy::ConsoleCommandFilterPolicy;
use crate::tracer::TracerFactory;

fn default_logs_enabled() -> bool {
    true
}

fn default_service_name() -> String {
    "application".to_string()
}

fn default_agent_address() -> String {
    "127.0.0.1:6831".to_string()
}

/// Process-wide configuration, read once at startup and immutable after.
///
/// Serializable fields can come from a config file; unknown keys are
/// rejected rather than silently accepted. The factory and listener hooks
/// are injected programmatically.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Global kill switch. When false the tracer is a no-op and the whole
    /// crate is inert: no spans, no serialization, no reporter traffic.
    pub enabled: bool,

    /// Whether log events are attached to the active span.
    pub logs_enabled: bool,

    /// Service name stamped on every reported span.
    pub service_name: String,

    /// Collector agent address for the default reporter, `host:port`.
    pub agent_address: String,

    pub console: ConsoleConfig,

    /// Custom tracer constructor; takes precedence over the default
    /// reporter wiring when tracing is enabled.
    #[serde(skip)]
    pub tracer_factory: Option<Arc<dyn TracerFactory>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            logs_enabled: default_logs_enabled(),
            service_name: default_service_name(),
            agent_address: default_agent_address(),
            console: ConsoleConfig::default(),
            tracer_factory: None,
        }
    }
}

impl Config {
    /// Startup validation; see [`ConfigError`] for what is rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.console.filter.validate()?;
        if self.enabled && self.tracer_factory.is_none() && self.agent_address.is_empty() {
            return Err(ConfigError::AgentAddress {
                address: String::new(),
                reason: "agent address is empty".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("enabled", &self.enabled)
            .field("logs_enabled", &self.logs_enabled)
            .field("service_name", &self.service_name)
            .field("agent_address", &self.agent_address)
            .field("console", &self.console)
            .field("tracer_factory", &self.tracer_factory.as_ref().map(|_| "<factory>"))
            .finish()
    }
}

/// Console instrumentation configuration.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConsoleConfig {
    pub filter: ConsoleCommandFilterPolicy,

    /// Replace the `arguments` tag value with a placeholder instead of the
    /// actual command line.
    pub redact_arguments: bool,

    /// Replaces the default tagging listener for command start/finish.
    #[serde(skip)]
    pub listener: Option<Arc<dyn ConsoleListener>>,
}

impl std::fmt::Debug for ConsoleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleConfig")
            .field("filter", &self.filter)
            .field("redact_arguments", &self.redact_arguments)
            .field("listener", &self.listener.as_ref().map(|_| "<listener>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_are_disabled_with_logs_on() {
        let config = Config::default();
        assert!(!config.enabled);
        assert!(config.logs_enabled);
        assert_eq!(config.service_name, "application");
        assert_eq!(config.agent_address, "127.0.0.1:6831");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_known_keys() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "enabled": true,
            "service_name": "billing",
            "console": { "filter": { "allow": ["queue:*"], "deny": ["queue:failed"] } }
        }))
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.service_name, "billing");
        assert!(config.console.filter.allows("queue:work"));
        assert!(!config.console.filter.allows("queue:failed"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = serde_json::from_value(serde_json::json!({
            "enabled": true,
            "sample_rate": 0.5
        }));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_filter_pattern_fails_validation() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "console": { "filter": { "allow": ["*:work"] } }
        }))
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FilterPattern { .. })
        ));
    }
}
