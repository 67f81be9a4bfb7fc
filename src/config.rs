use std::env;

use crate::error::ApiError;

/// Which key convention outgoing payloads use. Incoming records are accepted
/// in either convention regardless; ORDS auto-REST endpoints emit Oracle
/// column names, so uppercase is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldConvention {
    Lowercase,
    Uppercase,
}

#[derive(Debug, Clone)]
pub enum AuthMode {
    None,
    /// OAuth2 client-credentials grant against the ORDS token endpoint.
    ClientCredentials {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace URL, e.g. `https://oracleapex.com/ords/nathan_mks`.
    pub base_url: String,
    /// REST module path appended to the base, e.g. `/api/v1`.
    pub api_path: String,
    pub auth: AuthMode,
    pub page_size: Option<u32>,
    /// Seconds between automatic refreshes; 0 disables polling.
    pub auto_refresh_secs: u64,
    /// Serve fixed sample data instead of the network. Development only,
    /// never a fallback for a failing backend.
    pub demo_mode: bool,
    pub field_convention: FieldConvention,
}

impl Config {
    pub fn from_env() -> Result<Config, ApiError> {
        let demo_mode = env_flag("DONORHUB_DEMO_MODE");

        let base_url = match env::var("DONORHUB_API_URL") {
            Ok(v) if !v.trim().is_empty() => v.trim().trim_end_matches('/').to_string(),
            _ if demo_mode => String::new(),
            _ => {
                return Err(ApiError::Config(
                    "DONORHUB_API_URL must be set (or enable DONORHUB_DEMO_MODE)".to_string(),
                ))
            }
        };

        let api_path = env::var("DONORHUB_API_PATH").unwrap_or_else(|_| "/api/v1".to_string());

        let auth = match env::var("DONORHUB_AUTH_TYPE").as_deref() {
            Ok("oauth2") | Ok("client_credentials") => {
                let client_id = require_env("DONORHUB_CLIENT_ID")?;
                let client_secret = require_env("DONORHUB_CLIENT_SECRET")?;
                let token_url = env::var("DONORHUB_TOKEN_URL")
                    .unwrap_or_else(|_| format!("{}/oauth/token", base_url));
                AuthMode::ClientCredentials {
                    client_id,
                    client_secret,
                    token_url,
                }
            }
            _ => AuthMode::None,
        };

        let page_size = env::var("DONORHUB_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0);

        let auto_refresh_secs = env::var("DONORHUB_REFRESH_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let field_convention = match env::var("DONORHUB_FIELD_CASE").as_deref() {
            Ok("lowercase") | Ok("lower") => FieldConvention::Lowercase,
            _ => FieldConvention::Uppercase,
        };

        Ok(Config {
            base_url,
            api_path,
            auth,
            page_size,
            auto_refresh_secs,
            demo_mode,
            field_convention,
        })
    }

    /// Full prefix every collection path is joined onto.
    pub fn api_root(&self) -> String {
        format!("{}{}", self.base_url, self.api_path)
    }
}

fn require_env(name: &str) -> Result<String, ApiError> {
    env::var(name).map_err(|_| ApiError::Config(format!("{} must be set", name)))
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
