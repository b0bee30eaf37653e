pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_config, parse_config, ConfigError};
pub use types::{Config, RemoteConfig, RoleSourceConfig, ServerConfig, SourcesConfig};

const USER_CONFIG: &str = ".config/ngxtail/config.yml";
const SYSTEM_CONFIG: &str = "/etc/ngxtail/config.yml";

/// Matches `$env{NAME}` references.
pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Replace `$env{NAME}` with the value of `NAME`. Unset variables are left as
/// written so validation can report them. Comment lines are left alone.
pub fn expand_env_vars(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            if is_comment_line(line) {
                return line.to_string();
            }
            env_var_pattern()
                .replace_all(line, |caps: &regex::Captures| {
                    std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
                })
                .into_owned()
        })
        .collect()
}

/// Whole-line YAML comment.
pub(crate) fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return path.to_path_buf();
    };

    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// The explicit path if given, else the first existing of
/// `~/.config/ngxtail/config.yml` and `/etc/ngxtail/config.yml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    dirs::home_dir()
        .map(|home| home.join(USER_CONFIG))
        .into_iter()
        .chain(std::iter::once(PathBuf::from(SYSTEM_CONFIG)))
        .find(|candidate| candidate.exists())
}

/// Where `config init` writes when not printing to stdout.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(USER_CONFIG))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("NGXTAIL_EXPAND_A", "alpha");
        assert_eq!(expand_env_vars("x/$env{NGXTAIL_EXPAND_A}/y"), "x/alpha/y");
        assert_eq!(
            expand_env_vars("$env{NGXTAIL_EXPAND_A}:$env{NGXTAIL_EXPAND_UNSET}"),
            "alpha:$env{NGXTAIL_EXPAND_UNSET}"
        );
        std::env::remove_var("NGXTAIL_EXPAND_A");
    }

    #[test]
    fn test_comment_lines_are_not_expanded() {
        std::env::set_var("NGXTAIL_EXPAND_B", "beta");
        let text = "# token: $env{NGXTAIL_EXPAND_B}\n  token: $env{NGXTAIL_EXPAND_B}\n";
        assert_eq!(
            expand_env_vars(text),
            "# token: $env{NGXTAIL_EXPAND_B}\n  token: beta\n"
        );
        std::env::remove_var("NGXTAIL_EXPAND_B");
    }

    #[test]
    fn test_nginx_variables_are_not_env_vars() {
        let format = r#"$remote_addr [$time_local] "${request}""#;
        assert_eq!(expand_env_vars(format), format);
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/logs")), home.join("logs"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        assert_eq!(expand_tilde(Path::new("/var/log")), Path::new("/var/log"));
        assert_eq!(expand_tilde(Path::new("rel/~x")), Path::new("rel/~x"));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        assert_eq!(
            resolve_config_path(Some(Path::new("/tmp/ngxtail.yml"))),
            Some(PathBuf::from("/tmp/ngxtail.yml"))
        );
    }
}
