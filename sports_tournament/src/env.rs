//! Environment variable helpers shared by the configuration types.

/// Parse an environment variable, falling back to `default` when unset or invalid
pub fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
