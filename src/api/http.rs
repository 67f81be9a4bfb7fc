//! Live transport against the Oracle APEX REST module.

use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, TokenResponse, TokenUrl};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::{AuthMode, Config};
use crate::error::ApiError;

pub struct HttpBackend {
    client: reqwest::Client,
    root: String,
    auth: AuthMode,
    // Bearer token from the client-credentials exchange, fetched lazily.
    token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<HttpBackend, ApiError> {
        if config.base_url.is_empty() {
            return Err(ApiError::Config("base URL is not configured".to_string()));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(HttpBackend {
            client,
            root: config.api_root(),
            auth: config.auth.clone(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str, params: &[(String, String)]) -> String {
        let mut url = format!("{}{}", self.root, path);
        if !params.is_empty() {
            let query: String = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    async fn bearer_token(&self) -> Result<Option<String>, ApiError> {
        let AuthMode::ClientCredentials {
            client_id,
            client_secret,
            token_url,
        } = &self.auth
        else {
            return Ok(None);
        };

        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(Some(token.clone()));
        }

        let oauth_client = BasicClient::new(ClientId::new(client_id.clone()))
            .set_client_secret(ClientSecret::new(client_secret.clone()))
            .set_token_uri(
                TokenUrl::new(token_url.clone())
                    .map_err(|e| ApiError::Config(format!("invalid token URL: {}", e)))?,
            );

        let token_response = oauth_client
            .exchange_client_credentials()
            .request_async(&self.client)
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        let token = token_response.access_token().secret().clone();
        *self.token.write().await = Some(token.clone());
        tracing::info!("obtained OAuth2 access token");
        Ok(Some(token))
    }

    /// Discard the cached access token; true when one was actually held.
    async fn drop_cached_token(&self) -> bool {
        self.token.write().await.take().is_some()
    }

    async fn send_once(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let request = match self.bearer_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        Ok(request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let retry = request.try_clone();
        let mut response = self.send_once(request).await?;

        // An expired client-credentials token comes back as 401; re-exchange
        // once and replay the request.
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            && self.drop_cached_token().await
        {
            if let Some(retry) = retry {
                tracing::debug!("access token rejected, requesting a fresh one");
                response = self.send_once(retry).await?;
            }
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Surface the server's message verbatim where it sent one.
        let message = response.text().await.unwrap_or_default();
        let message = if message.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            message
        };
        tracing::warn!("HTTP {} from backend: {}", status.as_u16(), message);
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

impl super::Backend for HttpBackend {
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, ApiError> {
        let response = self.send(self.client.get(self.url(path, params))).await?;
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(value)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let response = self
            .send(self.client.post(self.url(path, &[])).json(body))
            .await?;
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(value)
    }

    async fn put(&self, path: &str, id: i64, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}{}/{}", self.root, path, id);
        let response = self.send(self.client.put(url).json(body)).await?;
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(value)
    }

    async fn delete(&self, path: &str, id: i64) -> Result<(), ApiError> {
        let url = format!("{}{}/{}", self.root, path, id);
        // DELETE responses usually carry no body; any 2xx counts as success.
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConvention;

    fn test_config() -> Config {
        Config {
            base_url: "https://apex.example.com/ords/hub".to_string(),
            api_path: "/api/v1".to_string(),
            auth: AuthMode::None,
            page_size: Some(20),
            auto_refresh_secs: 0,
            demo_mode: false,
            field_convention: FieldConvention::Uppercase,
        }
    }

    #[test]
    fn url_joins_path_and_encodes_params() {
        let backend = HttpBackend::new(&test_config()).expect("backend");
        assert_eq!(
            backend.url("/donors", &[]),
            "https://apex.example.com/ords/hub/api/v1/donors"
        );
        let url = backend.url(
            "/donors",
            &[("q".to_string(), "a b".to_string()), ("limit".to_string(), "5".to_string())],
        );
        assert_eq!(
            url,
            "https://apex.example.com/ords/hub/api/v1/donors?q=a+b&limit=5"
        );
    }

    #[tokio::test]
    async fn stale_token_is_dropped_exactly_once() {
        let backend = HttpBackend::new(&test_config()).expect("backend");
        *backend.token.write().await = Some("stale".to_string());
        // First 401 discards the cached token and permits a replay; a second
        // 401 in the same exchange finds nothing to discard and gives up.
        assert!(backend.drop_cached_token().await);
        assert!(!backend.drop_cached_token().await);
    }

    #[test]
    fn backend_requires_base_url() {
        let mut config = test_config();
        config.base_url = String::new();
        assert!(HttpBackend::new(&config).is_err());
    }
}
