//! Client configuration loaded from environment variables.

use std::time::Duration;

use chrono::{DateTime, Utc};
use raffle_core::notification::{validate_page_size, DEFAULT_PAGE_SIZE};
use raffle_core::session::{SessionContext, SessionUser};
use raffle_core::types::{DbId, Timestamp};

use crate::sync::{SyncConfig, DEFAULT_POLL_INTERVAL, DEFAULT_RECONCILE_DELAY};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Everything the `raffle-notify` binary needs to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base REST URL, e.g. `https://raffle.example.com/api`.
    pub api_url: String,
    pub api_token: Option<String>,
    /// Push endpoint; push is disabled when absent.
    pub push_ws_url: Option<String>,
    pub poll_interval_secs: u64,
    pub page_size: u32,
    pub reconcile_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub user_id: Option<DbId>,
    pub username: Option<String>,
    /// Draw instant to count down to.
    pub draw_at: Option<Timestamp>,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `API_URL`              | --      |
    /// | `API_TOKEN`            | unset   |
    /// | `PUSH_WS_URL`          | unset   |
    /// | `POLL_INTERVAL_SECS`   | `30`    |
    /// | `PAGE_SIZE`            | `20`    |
    /// | `RECONCILE_DELAY_MS`   | `450`   |
    /// | `REQUEST_TIMEOUT_SECS` | `30`    |
    /// | `SESSION_USER_ID`      | unset   |
    /// | `SESSION_USERNAME`     | unset   |
    /// | `DRAW_AT`              | unset   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = var("API_URL").ok_or(ConfigError::Missing("API_URL"))?;

        let poll_interval_secs =
            parse_or(&var, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL.as_secs())?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let page_size = parse_or(&var, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        validate_page_size(page_size).map_err(|_| ConfigError::Invalid {
            key: "PAGE_SIZE",
            value: page_size.to_string(),
        })?;

        let reconcile_delay_ms = parse_or(
            &var,
            "RECONCILE_DELAY_MS",
            DEFAULT_RECONCILE_DELAY.as_millis() as u64,
        )?;
        let request_timeout_secs = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?;

        let user_id = var("SESSION_USER_ID")
            .map(|v| {
                v.trim().parse::<DbId>().map_err(|_| ConfigError::Invalid {
                    key: "SESSION_USER_ID",
                    value: v,
                })
            })
            .transpose()?;

        let draw_at = var("DRAW_AT")
            .map(|v| {
                DateTime::parse_from_rfc3339(v.trim())
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|_| ConfigError::Invalid {
                        key: "DRAW_AT",
                        value: v,
                    })
            })
            .transpose()?;

        Ok(Self {
            api_url,
            api_token: var("API_TOKEN"),
            push_ws_url: var("PUSH_WS_URL"),
            poll_interval_secs,
            page_size,
            reconcile_delay_ms,
            request_timeout_secs,
            user_id,
            username: var("SESSION_USERNAME"),
            draw_at,
        })
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            page_size: self.page_size,
            reconcile_delay: Duration::from_millis(self.reconcile_delay_ms),
        }
    }

    /// Session described by the environment. Anonymous without a user id.
    pub fn session(&self) -> SessionContext {
        let user = self.user_id.map(|id| SessionUser {
            id,
            username: self.username.clone().unwrap_or_else(|| format!("user-{id}")),
            is_admin: false,
        });
        SessionContext {
            user,
            token: self.api_token.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<F, T>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("API_URL", "http://localhost:8000/api")]).expect("valid");
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.reconcile_delay_ms, 450);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.push_ws_url.is_none());
        assert!(config.draw_at.is_none());
        assert_eq!(config.sync_config(), SyncConfig::default());
    }

    #[test]
    fn api_url_is_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("API_URL")));
        assert_matches!(load(&[("API_URL", "  ")]), Err(ConfigError::Missing("API_URL")));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = load(&[("API_URL", "http://h"), ("POLL_INTERVAL_SECS", "0")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { key: "POLL_INTERVAL_SECS", .. });
    }

    #[test]
    fn oversized_page_is_rejected() {
        let err = load(&[("API_URL", "http://h"), ("PAGE_SIZE", "500")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { key: "PAGE_SIZE", .. });
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = load(&[("API_URL", "http://h"), ("RECONCILE_DELAY_MS", "soon")]).unwrap_err();
        assert_eq!(err.to_string(), "RECONCILE_DELAY_MS has an invalid value: soon");
    }

    #[test]
    fn session_from_user_vars() {
        let config = load(&[
            ("API_URL", "http://h"),
            ("API_TOKEN", "secret"),
            ("SESSION_USER_ID", "42"),
            ("SESSION_USERNAME", "ana"),
        ])
        .expect("valid");

        let session = config.session();
        assert_eq!(session.user_id(), Some(42));
        assert_eq!(session.user.as_ref().map(|u| u.username.as_str()), Some("ana"));
        assert_eq!(session.token.as_deref(), Some("secret"));
    }

    #[test]
    fn session_without_user_is_anonymous() {
        let config = load(&[("API_URL", "http://h"), ("API_TOKEN", "secret")]).expect("valid");
        assert!(!config.session().is_authenticated());
    }

    #[test]
    fn draw_at_parses_rfc3339() {
        let config = load(&[("API_URL", "http://h"), ("DRAW_AT", "2026-12-24T18:00:00+01:00")])
            .expect("valid");
        assert_eq!(
            config.draw_at,
            Some(Utc.with_ymd_and_hms(2026, 12, 24, 17, 0, 0).unwrap())
        );
    }

    #[test]
    fn overrides_flow_into_sync_config() {
        let config = load(&[
            ("API_URL", "http://h"),
            ("POLL_INTERVAL_SECS", "5"),
            ("PAGE_SIZE", "50"),
            ("RECONCILE_DELAY_MS", "100"),
        ])
        .expect("valid");
        let sync = config.sync_config();
        assert_eq!(sync.poll_interval, Duration::from_secs(5));
        assert_eq!(sync.page_size, 50);
        assert_eq!(sync.reconcile_delay, Duration::from_millis(100));
    }
}
