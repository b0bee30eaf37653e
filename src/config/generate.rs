pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# NGXTAIL CONFIGURATION
# =============================================================================
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/ngxtail/config.yml
#   3. /etc/ngxtail/config.yml
#
# Values may reference environment variables as $env{NAME}.

# =============================================================================
# SERVER
# =============================================================================
server:
  listen: "127.0.0.1:7200"
  # Require "Authorization: Bearer <token>" on /api/* requests. Set this on
  # instances that other instances use as their remote delegate.
  # auth_token: $env{NGXTAIL_TOKEN}

# =============================================================================
# SOURCES
# =============================================================================
# For each role, configure either a single file (path) or a directory (dir).
# A directory is scanned for *.log files (and *.gz archives when requested);
# files with "error" in their name belong to the error role.
#
# Resolution order per request:
#   remote -> path -> dir -> the other role's dir -> /var/log/nginx/<role>.log
sources:
  access:
    dir: /var/log/nginx
  error: {}
    # path: /var/log/nginx/error.log

# =============================================================================
# REMOTE (optional)
# =============================================================================
# Forward every request to another ngxtail instance instead of reading local
# files.
# remote:
#   url: http://logs-agent.internal:7200
#   token: $env{NGXTAIL_TOKEN}
#   timeout: 10s

# =============================================================================
# PARSING
# =============================================================================
parsing: {}
  # Custom NGINX log_format for access logs. Defaults to "combined".
  # access_format: '$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent" $request_time'
"#
    .to_string()
}
