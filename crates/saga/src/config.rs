//! Dispatcher configuration loaded from environment variables.

use std::str::FromStr;

/// What to do when a saga configures more than one correlation rule for the
/// same message type. The last rule wins either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Log a warning and keep the last rule.
    #[default]
    Warn,
    /// Refuse to build the dispatcher.
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(DuplicatePolicy::Warn),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!("unknown duplicate correlation policy: {other}")),
        }
    }
}

/// Dispatcher configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `SAGA_DUPLICATE_CORRELATION`: `warn` or `reject` (default: `warn`)
/// - `SAGA_LOCK_CORRELATION_KEYS`: hold the store's per-key write region
///   for the whole dispatch (default: `true`)
/// - `SAGA_COMMIT_RETRIES`: how many times a dispatch whose commit lost a
///   race is re-run from a fresh lookup (default: `3`)
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub duplicate_correlation: DuplicatePolicy,
    pub lock_correlation_keys: bool,
    pub commit_retries: u32,
}

impl DispatcherConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            duplicate_correlation: lookup("SAGA_DUPLICATE_CORRELATION")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.duplicate_correlation),
            lock_correlation_keys: lookup("SAGA_LOCK_CORRELATION_KEYS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.lock_correlation_keys),
            commit_retries: lookup("SAGA_COMMIT_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.commit_retries),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            duplicate_correlation: DuplicatePolicy::Warn,
            lock_correlation_keys: true,
            commit_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = DispatcherConfig::default();
        assert_eq!(config.duplicate_correlation, DuplicatePolicy::Warn);
        assert!(config.lock_correlation_keys);
        assert_eq!(config.commit_retries, 3);
    }

    #[test]
    fn test_reads_variables() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("SAGA_DUPLICATE_CORRELATION", "Reject"),
            ("SAGA_LOCK_CORRELATION_KEYS", "false"),
            ("SAGA_COMMIT_RETRIES", "10"),
        ]));
        assert_eq!(config.duplicate_correlation, DuplicatePolicy::Reject);
        assert!(!config.lock_correlation_keys);
        assert_eq!(config.commit_retries, 10);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("SAGA_DUPLICATE_CORRELATION", "explode"),
            ("SAGA_LOCK_CORRELATION_KEYS", "sometimes"),
            ("SAGA_COMMIT_RETRIES", "-1"),
        ]));
        assert_eq!(config.duplicate_correlation, DuplicatePolicy::Warn);
        assert!(config.lock_correlation_keys);
        assert_eq!(config.commit_retries, 3);
    }

    #[test]
    fn test_policy_parse_error() {
        let err = "explode".parse::<DuplicatePolicy>().unwrap_err();
        assert_eq!(err, "unknown duplicate correlation policy: explode");
    }
}
