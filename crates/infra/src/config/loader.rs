//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes a few well-known paths for config files
//! 4. Supports TOML and JSON formats
//!
//! ## Environment Variables
//! - `HELMGATE_IDP_BASE_URL`: IdP base URL
//! - `HELMGATE_IDP_REALM`: IdP realm name
//! - `HELMGATE_IDP_CLIENT_ID`: OAuth client ID
//! - `HELMGATE_REDIRECT_URI`: Redirect URI registered with the IdP
//! - `HELMGATE_API_BASE_URL`: Backend API base URL
//! - `HELMGATE_STORAGE_PATH`: Durable storage file path
//! - `HELMGATE_SCOPES`: Space-separated scopes (optional)
//! - `HELMGATE_API_TIMEOUT_SECS`: Request timeout in seconds (optional)
//! - `HELMGATE_POST_LOGOUT_REDIRECT_URI`: Post-logout destination (optional)

use std::path::{Path, PathBuf};

use helmgate_domain::{ApiConfig, AuthError, Config, IdpConfig, Result, StorageConfig};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after sourcing `.env`
/// when present). If any required variable is missing, falls back to loading
/// from a config file.
///
/// # Errors
/// Returns [`AuthError::Config`] if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();

    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "incomplete environment, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns [`AuthError::Config`] naming the first missing required variable.
pub fn load_from_env() -> Result<Config> {
    let idp = IdpConfig {
        base_url: required("HELMGATE_IDP_BASE_URL")?,
        realm: required("HELMGATE_IDP_REALM")?,
        client_id: required("HELMGATE_IDP_CLIENT_ID")?,
        redirect_uri: required("HELMGATE_REDIRECT_URI")?,
        scopes: match std::env::var("HELMGATE_SCOPES") {
            Ok(raw) => raw.split_whitespace().map(str::to_string).collect(),
            Err(_) => vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
        },
        post_logout_redirect_uri: std::env::var("HELMGATE_POST_LOGOUT_REDIRECT_URI").ok(),
    };

    let api = ApiConfig {
        base_url: required("HELMGATE_API_BASE_URL")?,
        timeout_secs: match std::env::var("HELMGATE_API_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AuthError::Config("HELMGATE_API_TIMEOUT_SECS must be a number".into()))?,
            Err(_) => 30,
        },
    };

    let storage = StorageConfig { path: PathBuf::from(required("HELMGATE_STORAGE_PATH")?) };

    Ok(Config { idp, api, storage })
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| AuthError::Config(format!("missing environment variable {name}")))
}

/// Load configuration from a file
///
/// With an explicit `path`, only that file is read. Otherwise the loader
/// probes `config.toml`, `config.json`, `helmgate.toml`, and `helmgate.json`
/// in the working directory and its parent.
///
/// # Errors
/// Returns [`AuthError::Config`] if no file is found or the file cannot be
/// parsed.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths()
            .ok_or_else(|| AuthError::Config("no config file found".into()))?,
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| AuthError::Config(format!("cannot read {}: {e}", path.display())))?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| AuthError::Config(format!("invalid TOML in {}: {e}", path.display())))?,
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| AuthError::Config(format!("invalid JSON in {}: {e}", path.display())))?,
        _ => {
            return Err(AuthError::Config(format!(
                "unsupported config format: {}",
                path.display()
            )))
        }
    };

    tracing::info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    let names = ["config.toml", "config.json", "helmgate.toml", "helmgate.json"];
    let bases = [PathBuf::from("."), PathBuf::from("..")];

    for base in &bases {
        for name in &names {
            let candidate = base.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    //! Unit tests for config::loader.
    use std::io::Write;

    use super::*;

    const SAMPLE_TOML: &str = r#"
        [idp]
        base_url = "https://id.example.com"
        realm = "helmgate"
        client_id = "admin-console"
        redirect_uri = "https://admin.example.com/"

        [api]
        base_url = "https://api.example.com/v1"
        timeout_secs = 10

        [storage]
        path = "/tmp/helmgate.json"
    "#;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        let config = load_from_file(Some(&path)).unwrap();

        assert_eq!(config.idp.realm, "helmgate");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.idp.scopes.len(), 3);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let json = serde_json::json!({
            "idp": {
                "base_url": "https://id.example.com",
                "realm": "helmgate",
                "client_id": "admin-console",
                "redirect_uri": "https://admin.example.com/"
            },
            "api": { "base_url": "https://api.example.com/v1" },
            "storage": { "path": "/tmp/helmgate.json" }
        });
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let config = load_from_file(Some(&path)).unwrap();

        assert_eq!(config.idp.client_id, "admin-console");
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "whatever").unwrap();

        let result = load_from_file(Some(&path));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = load_from_file(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }
}
