use std::env;

pub const DEFAULT_LEVEL: &str = "info";
pub const DEFAULT_KEEP_DAYS: u64 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. `info` or `info,link=debug`.
    pub level: String,
    pub keep_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: DEFAULT_LEVEL.to_string(),
            keep_days: DEFAULT_KEEP_DAYS,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unknown or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let enabled = lookup("UPLINKD_LOGS")
            .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("off")))
            .unwrap_or(defaults.enabled);
        let level = lookup("UPLINKD_LOG_LEVEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.level);
        let keep_days = lookup("UPLINKD_LOG_KEEP_DAYS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(defaults.keep_days);

        Self {
            enabled,
            level,
            keep_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(LoggingConfig::from_lookup(lookup(&[])), LoggingConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = LoggingConfig::from_lookup(lookup(&[
            ("UPLINKD_LOGS", "false"),
            ("UPLINKD_LOG_LEVEL", "debug,dhcp=trace"),
            ("UPLINKD_LOG_KEEP_DAYS", "3"),
        ]));
        assert!(!cfg.enabled);
        assert_eq!(cfg.level, "debug,dhcp=trace");
        assert_eq!(cfg.keep_days, 3);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = LoggingConfig::from_lookup(lookup(&[
            ("UPLINKD_LOGS", "yes"),
            ("UPLINKD_LOG_LEVEL", "  "),
            ("UPLINKD_LOG_KEEP_DAYS", "forever"),
        ]));
        assert!(cfg.enabled);
        assert_eq!(cfg.level, DEFAULT_LEVEL);
        assert_eq!(cfg.keep_days, DEFAULT_KEEP_DAYS);
    }
}
