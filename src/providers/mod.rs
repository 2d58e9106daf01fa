//! Metal price provider implementations

pub mod fallback;
pub mod freegold;
pub mod gold_api;
pub mod goldprice;

pub use fallback::{ExhaustionPolicy, FallbackChain, SnapshotUpdate, StaticEstimate};
pub use freegold::FreeGoldApiProvider;
pub use gold_api::GoldApiProvider;
pub use goldprice::GoldPriceOrgProvider;

use crate::{
    config::{PriceConfig, ProviderKind},
    error::ProviderError,
    provider::MetalPriceProvider,
};
use reqwest::Client;
use std::sync::Arc;

/// Builds the HTTP client shared by all providers
pub fn build_client(config: &PriceConfig) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Instantiates the configured providers, in configured order
pub fn build_providers(config: &PriceConfig, client: &Client) -> Vec<Arc<dyn MetalPriceProvider>> {
    config
        .providers
        .iter()
        .map(|kind| -> Arc<dyn MetalPriceProvider> {
            match kind {
                ProviderKind::FreeGold => Arc::new(FreeGoldApiProvider::new(client.clone(), config)),
                ProviderKind::GoldApi => Arc::new(GoldApiProvider::new(client.clone(), config)),
                ProviderKind::GoldPriceOrg => {
                    Arc::new(GoldPriceOrgProvider::new(client.clone(), config))
                }
            }
        })
        .collect()
}

/// GETs `url` and returns the body of a successful response
pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    provider: &'static str,
) -> Result<String, ProviderError> {
    tracing::debug!(provider, url, "Fetching metal prices");

    let response = client.get(url).send().await?;

    // Check for rate limiting
    if response.status().as_u16() == 429 {
        return Err(ProviderError::RateLimitExceeded);
    }

    if !response.status().is_success() {
        return Err(ProviderError::Transport {
            provider,
            status: response.status().as_u16(),
        });
    }

    Ok(response.text().await?)
}

/// Rejects prices no market would quote
pub(crate) fn ensure_price(value: f64, what: &str) -> Result<f64, ProviderError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ProviderError::invalid(format!("{} price {} is not positive", what, value)))
    }
}

/// Minimal HTTP responder for provider tests
#[cfg(test)]
pub(crate) mod test_server {
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::watch;

    /// A canned response for one request path
    #[derive(Clone)]
    pub struct Route {
        pub path: &'static str,
        pub status: u16,
        pub body: String,
        /// Reply only once this other path has been requested
        pub held_until: Option<&'static str>,
    }

    impl Route {
        pub fn ok(path: &'static str, body: impl Into<String>) -> Self {
            Self {
                path,
                status: 200,
                body: body.into(),
                held_until: None,
            }
        }

        pub fn status(path: &'static str, status: u16) -> Self {
            Self {
                path,
                status,
                body: String::new(),
                held_until: None,
            }
        }

        pub fn held_until(mut self, path: &'static str) -> Self {
            self.held_until = Some(path);
            self
        }
    }

    /// Serves `routes` on an ephemeral port and returns the base URL.
    /// Unknown paths get a 404.
    pub async fn serve(routes: Vec<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(watch::Sender::new(Vec::<String>::new()));

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let route = routes.iter().find(|r| r.path == path);
                    let mut requested = seen.subscribe();
                    seen.send_modify(|paths| paths.push(path.to_string()));
                    if let Some(other) = route.and_then(|r| r.held_until) {
                        let closed = requested
                            .wait_for(|paths| paths.iter().any(|p| p == other))
                            .await
                            .is_err();
                        if closed {
                            return;
                        }
                    }
                    let (status, body) = match route {
                        Some(route) => (route.status, route.body.as_str()),
                        None => (404, ""),
                    };
                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }
}
