use crate::source::LogRole;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    /// When present, every request is forwarded to this remote instance and
    /// local sources are ignored.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub parsing: ParsingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Bearer token required on `/api/*` when set.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            auth_token: None,
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:7200".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub access: RoleSourceConfig,
    #[serde(default)]
    pub error: RoleSourceConfig,
}

impl SourcesConfig {
    pub fn for_role(&self, role: LogRole) -> &RoleSourceConfig {
        match role {
            LogRole::Access => &self.access,
            LogRole::Error => &self.error,
        }
    }
}

/// Where the logs of one role live. `path` wins over `dir` when both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleSourceConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_remote_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

pub fn default_remote_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Custom `log_format` for access logs; `combined` when unset.
    #[serde(default)]
    pub access_format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:7200");
        assert!(config.remote.is_none());
        assert!(config.sources.access.dir.is_none());
        assert!(config.parsing.access_format.is_none());
    }

    #[test]
    fn test_remote_timeout() {
        let config: Config = serde_yaml::from_str(
            "remote:\n  url: http://agent:7200\n  timeout: 3s\n",
        )
        .unwrap();
        let remote = config.remote.unwrap();
        assert_eq!(remote.timeout, Duration::from_secs(3));
        assert!(remote.token.is_none());

        let config: Config = serde_yaml::from_str("remote:\n  url: http://agent:7200\n").unwrap();
        assert_eq!(config.remote.unwrap().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_for_role() {
        let config: Config = serde_yaml::from_str(
            "sources:\n  access:\n    dir: /logs\n  error:\n    path: /logs/error.log\n",
        )
        .unwrap();
        assert_eq!(
            config.sources.for_role(LogRole::Access).dir,
            Some(PathBuf::from("/logs"))
        );
        assert_eq!(
            config.sources.for_role(LogRole::Error).path,
            Some(PathBuf::from("/logs/error.log"))
        );
    }
}
