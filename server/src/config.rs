use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://users.db";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "client/dist";

const WORKSPACE_POI_PATH: &str = "server/data/points-of-interest.json";
const CRATE_POI_PATH: &str = "./data/points-of-interest.json";
const WORKSPACE_MIGRATIONS_DIR: &str = "server/migrations";
const CRATE_MIGRATIONS_DIR: &str = "./migrations";

pub const POI_REFRESH_SECS: u64 = 300; // re-read every 5 minutes
pub const MAX_NAME_LEN: usize = 64;

pub fn database_url() -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

pub fn db_max_connections() -> u32 {
    std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
}

pub fn server_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

/// Addresses allowed to clear the roster and delete any record.
pub fn admin_ips() -> Vec<String> {
    std::env::var("OSIRIS_ADMIN_IPS")
        .map(|value| parse_ip_list(&value))
        .unwrap_or_default()
}

/// Reverse proxies whose `X-Forwarded-For` header names the real client.
pub fn trusted_proxies() -> Vec<String> {
    std::env::var("OSIRIS_TRUSTED_PROXIES")
        .map(|value| parse_ip_list(&value))
        .unwrap_or_default()
}

pub fn poi_path() -> PathBuf {
    if let Ok(value) = std::env::var("POI_PATH")
        && !value.trim().is_empty()
    {
        return PathBuf::from(value.trim());
    }
    let workspace_path = PathBuf::from(WORKSPACE_POI_PATH);
    if workspace_path.exists() {
        return workspace_path;
    }
    PathBuf::from(CRATE_POI_PATH)
}

/// Migration directory: `MIGRATIONS_DIR`, else the workspace layout, else the crate layout.
pub fn migrations_dir() -> PathBuf {
    if let Ok(value) = std::env::var("MIGRATIONS_DIR")
        && !value.trim().is_empty()
    {
        return PathBuf::from(value.trim());
    }
    let workspace_path = PathBuf::from(WORKSPACE_MIGRATIONS_DIR);
    if workspace_path.is_dir() {
        return workspace_path;
    }
    PathBuf::from(CRATE_MIGRATIONS_DIR)
}

pub fn static_dir() -> String {
    std::env::var("STATIC_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
}

fn parse_ip_list(raw: &str) -> Vec<String> {
    let mut ips: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
        .collect();
    ips.dedup();
    ips
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_ips_are_trimmed_and_filtered() {
        temp_env::with_var("OSIRIS_ADMIN_IPS", Some(" 10.0.0.1, ,192.168.1.9 "), || {
            assert_eq!(admin_ips(), vec!["10.0.0.1", "192.168.1.9"]);
        });
    }

    #[test]
    fn admin_ips_default_to_none() {
        temp_env::with_var_unset("OSIRIS_ADMIN_IPS", || {
            assert!(admin_ips().is_empty());
        });
    }

    #[test]
    fn trusted_proxies_default_to_none() {
        temp_env::with_var_unset("OSIRIS_TRUSTED_PROXIES", || {
            assert!(trusted_proxies().is_empty());
        });
        temp_env::with_var("OSIRIS_TRUSTED_PROXIES", Some("10.0.0.254,::1"), || {
            assert_eq!(trusted_proxies(), vec!["10.0.0.254", "::1"]);
        });
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        temp_env::with_vars(
            [("DB_MAX_CONNECTIONS", Some("0")), ("PORT", Some("not-a-port"))],
            || {
                assert_eq!(db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
            },
        );
    }

    #[test]
    fn database_url_ignores_blank_values() {
        temp_env::with_var("DATABASE_URL", Some("  "), || {
            assert_eq!(database_url(), DEFAULT_DATABASE_URL);
        });
        temp_env::with_var("DATABASE_URL", Some("sqlite::memory:"), || {
            assert_eq!(database_url(), "sqlite::memory:");
        });
    }
}
