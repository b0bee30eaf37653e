use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars, expand_tilde, is_comment_line};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml)
}

/// Parse config text: expand `$env{VAR}`, deserialize, expand `~` in paths, validate.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    let mut config: Config = serde_yaml::from_str(&yaml)?;
    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn check_unexpanded_vars(yaml: &str) -> Result<(), ConfigError> {
    let mut missing: Vec<String> = yaml
        .lines()
        .filter(|line| !is_comment_line(line))
        .flat_map(|line| env_var_pattern().captures_iter(line))
        .map(|caps| caps[1].to_string())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    missing.sort();
    missing.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables not set: {}\n\
         Set them (e.g. export {}=...) or replace the $env{{..}} references with literal values",
        missing.join(", "),
        missing[0]
    )))
}

fn expand_paths(config: &mut Config) {
    for role in [&mut config.sources.access, &mut config.sources.error] {
        role.path = role.path.as_deref().map(expand_tilde);
        role.dir = role.dir.as_deref().map(expand_tilde);
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.server.listen.trim().is_empty() {
        errors.push("server.listen must not be empty".to_string());
    }

    if let Some(remote) = &config.remote {
        if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
            errors.push(format!(
                "remote.url '{}' must start with http:// or https://",
                remote.url
            ));
        }
        if remote.timeout.is_zero() {
            errors.push("remote.timeout must be greater than zero".to_string());
        }
    }

    for (name, role) in [("access", &config.sources.access), ("error", &config.sources.error)] {
        if let Some(path) = &role.path {
            if path.as_os_str().is_empty() {
                errors.push(format!("sources.{}.path must not be empty", name));
            }
        }
        if let Some(dir) = &role.dir {
            if dir.as_os_str().is_empty() {
                errors.push(format!("sources.{}.dir must not be empty", name));
            }
        }
        if role.path.is_some() && role.dir.is_some() {
            tracing::warn!(role = name, "Both path and dir configured, path takes precedence");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  listen: "0.0.0.0:9000"
  auth_token: secret
sources:
  access:
    dir: /var/log/nginx
  error:
    path: /var/log/nginx/error.log
parsing:
  access_format: '$remote_addr [$time_local] "$request" $status'
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.server.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.sources.access.dir, Some(PathBuf::from("/var/log/nginx")));
        assert!(config.parsing.access_format.unwrap().contains("$request"));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/ngxtail.yml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = parse_config("server: [unclosed");
        assert!(matches!(result, Err(ConfigError::YamlParse(_))));
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("NGXTAIL_TEST_TOKEN", "tok-123");
        let config = parse_config(
            "remote:\n  url: http://agent:7200\n  token: $env{NGXTAIL_TEST_TOKEN}\n",
        )
        .unwrap();
        assert_eq!(config.remote.unwrap().token.as_deref(), Some("tok-123"));
        std::env::remove_var("NGXTAIL_TEST_TOKEN");
    }

    #[test]
    fn test_unset_env_var_is_rejected() {
        let result = parse_config("sources:\n  access:\n    dir: $env{NGXTAIL_SURELY_UNSET}\n");
        match result {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("NGXTAIL_SURELY_UNSET")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_remote_url() {
        let result = parse_config("remote:\n  url: agent:7200\n  timeout: 0s\n");
        match result {
            Err(ConfigError::ValidationList(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation list, got {:?}", other),
        }
    }

    #[test]
    fn test_tilde_expanded_in_sources() {
        let config = parse_config("sources:\n  access:\n    dir: ~/logs\n").unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.sources.access.dir, Some(home.join("logs")));
        }
    }
}
