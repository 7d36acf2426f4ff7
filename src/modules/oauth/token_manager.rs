use crate::core::config::{OAuthConfig, OAuthGrant};
use crate::core::error::AppError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Response from an OAuth2 token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Google always sends this; the CRM client-credentials flow does not
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default, rename = "token_type")]
    pub _token_type: Option<String>,
}

/// Cached token with expiration tracking
struct TokenCache {
    token: TokenResponse,
    lifetime: Duration,
    fetched_at: Instant,
}

/// Manages OAuth2 access tokens for one outbound endpoint, with caching
pub struct OAuthTokenManager {
    name: &'static str,
    config: OAuthConfig,
    client: reqwest::Client,
    cache: Arc<RwLock<Option<TokenCache>>>,
    /// Refresh token this many seconds before expiration
    refresh_margin: Duration,
}

impl OAuthTokenManager {
    pub fn new(name: &'static str, config: OAuthConfig, client: reqwest::Client) -> Self {
        Self {
            name,
            config,
            client,
            cache: Arc::new(RwLock::new(None)),
            refresh_margin: Duration::from_secs(60),
        }
    }

    /// Get a valid access token, fetching a new one if necessary
    pub async fn get_access_token(&self) -> Result<String, TokenError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                let elapsed = cached.fetched_at.elapsed();

                if elapsed + self.refresh_margin < cached.lifetime {
                    tracing::debug!(
                        "Using cached {} token (expires in {} seconds)",
                        self.name,
                        (cached.lifetime - elapsed).as_secs()
                    );
                    return Ok(cached.token.access_token.clone());
                }
            }
        }

        // Cache miss or near expiration - fetch new token
        let token = self.fetch_token().await?;
        Ok(token.access_token)
    }

    /// Drop the cached token, e.g. after the API rejected it
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        if cache.take().is_some() {
            tracing::info!("Invalidated cached {} token", self.name);
        }
    }

    async fn fetch_token(&self) -> Result<TokenResponse, TokenError> {
        tracing::debug!(
            "Fetching new {} token from {}",
            self.name,
            self.config.token_url
        );

        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        match &self.config.grant {
            OAuthGrant::ClientCredentials { scope } => {
                form.push(("grant_type", "client_credentials"));
                if let Some(scope) = scope {
                    form.push(("scope", scope.as_str()));
                }
            }
            OAuthGrant::RefreshToken { refresh_token } => {
                form.push(("grant_type", "refresh_token"));
                form.push(("refresh_token", refresh_token.as_str()));
            }
        }

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| TokenError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::FetchError(format!(
                "Token request failed: HTTP {} - {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::ParseError(e.to_string()))?;

        let lifetime = token_response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.config.default_token_lifetime);

        tracing::info!(
            "Fetched new {} token, expires in {} seconds",
            self.name,
            lifetime.as_secs()
        );

        let mut cache = self.cache.write().await;
        *cache = Some(TokenCache {
            token: token_response.clone(),
            lifetime,
            fetched_at: Instant::now(),
        });

        Ok(token_response)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to fetch token: {0}")]
    FetchError(String),

    #[error("Failed to parse token response: {0}")]
    ParseError(String),
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        AppError::ExternalServiceError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::spawn_test_server;
    use axum::{extract::State, routing::post, Form, Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(token_url: String, grant: OAuthGrant) -> OAuthConfig {
        OAuthConfig {
            token_url,
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            grant,
            default_token_lifetime: Duration::from_secs(1800),
        }
    }

    async fn token_server(expires_in: Option<u64>) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/token",
                post(
                    move |State(calls): State<Arc<AtomicUsize>>,
                          Form(form): Form<HashMap<String, String>>| async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        let mut body = serde_json::json!({
                            "access_token": format!("{}-{}", form["grant_type"], n),
                            "token_type": "Bearer",
                        });
                        if let Some(secs) = expires_in {
                            body["expires_in"] = secs.into();
                        }
                        Json(body)
                    },
                ),
            )
            .with_state(Arc::clone(&calls));

        let base = spawn_test_server(app).await;
        (format!("{}/token", base), calls)
    }

    #[tokio::test]
    async fn test_token_is_cached_until_invalidated() {
        let (url, calls) = token_server(Some(3600)).await;
        let manager = OAuthTokenManager::new(
            "crm",
            config(
                url,
                OAuthGrant::RefreshToken {
                    refresh_token: "refresh".to_string(),
                },
            ),
            reqwest::Client::new(),
        );

        assert_eq!(manager.get_access_token().await.unwrap(), "refresh_token-1");
        assert_eq!(manager.get_access_token().await.unwrap(), "refresh_token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        manager.invalidate().await;
        assert_eq!(manager.get_access_token().await.unwrap(), "refresh_token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_expires_in_uses_default_lifetime() {
        let (url, calls) = token_server(None).await;
        let manager = OAuthTokenManager::new(
            "crm",
            config(url, OAuthGrant::ClientCredentials { scope: None }),
            reqwest::Client::new(),
        );

        assert_eq!(
            manager.get_access_token().await.unwrap(),
            "client_credentials-1"
        );
        manager.get_access_token().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refetched() {
        // Lifetime inside the refresh margin is never served from cache
        let (url, calls) = token_server(Some(30)).await;
        let manager = OAuthTokenManager::new(
            "crm",
            config(url, OAuthGrant::ClientCredentials { scope: None }),
            reqwest::Client::new(),
        );

        manager.get_access_token().await.unwrap();
        manager.get_access_token().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
