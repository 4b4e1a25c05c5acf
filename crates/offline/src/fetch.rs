use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::http::{Request, Response, ResponseType};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported method '{0}'")]
    Method(String),
    #[error("network request for {url} failed: {source}")]
    Network {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("network unavailable: {0}")]
    Unavailable(String),
}

/// Outbound network access used on cache misses and during install.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Fetches over HTTP(S) and classifies responses relative to the application origin.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Url,
}

impl HttpFetcher {
    pub fn new(origin: Url) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tasklight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Network {
                url: origin.clone(),
                source,
            })?;
        Ok(Self { client, origin })
    }

    fn classify(&self, requested: &Url, landed: &Url) -> ResponseType {
        let origin = self.origin.origin();
        match (requested.origin() == origin, landed.origin() == origin) {
            (true, true) => ResponseType::Basic,
            (true, false) => ResponseType::OpaqueRedirect,
            (false, _) => ResponseType::Cors,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::Method(request.method.clone()))?;
        let network = |source: reqwest::Error| FetchError::Network {
            url: request.url.clone(),
            source,
        };

        let reply = self
            .client
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(network)?;

        let landed = reply.url().clone();
        let status = reply.status().as_u16();
        let headers = reply
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = reply.bytes().await.map_err(network)?.to_vec();

        tracing::debug!(url = %request.url, status, "network fetch");
        Ok(Response {
            redirected: landed != request.url,
            kind: self.classify(&request.url, &landed),
            url: landed,
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn same_origin_responses_are_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/styles.css"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("body{}", "text/css"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let origin = Url::parse(&server.uri()).unwrap();
        let fetcher = HttpFetcher::new(origin.clone()).unwrap();
        let response = fetcher
            .fetch(&Request::get(origin.join("/styles.css").unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.kind, ResponseType::Basic);
        assert!(!response.redirected);
        assert_eq!(response.body, b"body{}".to_vec());
        assert_eq!(response.header("content-type"), Some("text/css"));
        assert!(response.is_cacheable());
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let origin = Url::parse(&server.uri()).unwrap();
        let fetcher = HttpFetcher::new(origin.clone()).unwrap();
        let response = fetcher
            .fetch(&Request::get(origin.join("/missing.png").unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_cacheable());
    }

    #[tokio::test]
    async fn other_origins_are_not_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Url::parse("https://todo.example").unwrap()).unwrap();
        let foreign = Url::parse(&server.uri()).unwrap().join("/lib.js").unwrap();
        let response = fetcher.fetch(&Request::get(foreign)).await.unwrap();

        assert_eq!(response.kind, ResponseType::Cors);
        assert!(!response.is_cacheable());
    }
}
