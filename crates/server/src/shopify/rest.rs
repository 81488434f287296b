//! REST transport: paginated reads with bounded retry.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, LINK, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::config::ShopifySettings;
use crate::shopify::ShopifyError;
use crate::shopify::types::{RemoteCustomer, RemoteOrder, RemoteProduct};
use crate::sync::feed::{FeedFactory, Page, RemoteFeed};
use crate::sync::store::TenantCredentials;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Fallback wait when a 429 arrives without a `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Builds one [`RestClient`] per tenant from shared transport configuration.
///
/// The orchestrator receives this factory as an explicit dependency; there is
/// no process-wide client singleton.
#[derive(Clone)]
pub struct RestFeedFactory {
    http: reqwest::Client,
    settings: ShopifySettings,
}

impl RestFeedFactory {
    /// Create a factory with a shared connection pool and per-request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the underlying client cannot be built.
    pub fn new(settings: ShopifySettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self { http, settings })
    }
}

impl FeedFactory for RestFeedFactory {
    type Feed = RestClient;

    fn feed(&self, credentials: &TenantCredentials) -> RestClient {
        let domain = normalize_domain(&credentials.shop_domain);

        RestClient {
            http: self.http.clone(),
            base_url: format!(
                "https://{domain}/admin/api/{}",
                self.settings.api_version
            ),
            access_token: credentials.access_token.clone(),
            page_size: self.settings.page_size,
            max_retries: self.settings.max_retries,
            retry_base: self.settings.retry_base,
        }
    }
}

/// Authenticated REST reader for one tenant's shop.
///
/// Implements `Debug` manually to redact the access token.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    access_token: SecretString,
    page_size: u32,
    max_retries: u32,
    retry_base: Duration,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl RestClient {
    /// Fetch one page of an entity collection.
    ///
    /// `extra_query` applies to the first page only: the remote rejects
    /// filter parameters alongside `page_info`, so cursor requests carry
    /// just `limit` and the cursor.
    async fn entity_page<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        extra_query: &[(&str, &str)],
        cursor: Option<&str>,
    ) -> Result<Page<T>, ShopifyError> {
        let mut query: Vec<(String, String)> =
            vec![("limit".to_string(), self.page_size.to_string())];
        if let Some(page_info) = cursor {
            query.push(("page_info".to_string(), page_info.to_string()));
        } else {
            for (name, value) in extra_query {
                query.push(((*name).to_string(), (*value).to_string()));
            }
        }

        let response = self.send_with_retry(path, &query).await?;

        // The cursor lives in the Link header; grab it before consuming the
        // body.
        let next_cursor = next_page_info(response.headers());

        let body: Value = response.json().await?;
        let raw_items = body.get(key).and_then(Value::as_array).ok_or_else(|| {
            ShopifyError::Decode(format!("missing '{key}' array in response body"))
        })?;

        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            match serde_json::from_value::<T>(raw.clone()) {
                Ok(item) => items.push(item),
                // Per-record decode failures skip the record, not the batch.
                Err(error) => warn!(collection = key, %error, "skipping undecodable record"),
            }
        }

        Ok(Page { items, next_cursor })
    }

    /// Issue a GET, retrying transient failures with exponential backoff and
    /// jitter up to the configured bound.
    async fn send_with_retry(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<reqwest::Response, ShopifyError> {
        let url = format!("{}/{path}", self.base_url);
        let mut attempts = 0_u32;

        loop {
            attempts += 1;

            let error = match self.send_once(&url, query).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            if !is_transient(&error) {
                return Err(error);
            }
            if attempts > self.max_retries {
                return Err(ShopifyError::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                });
            }

            let retry_after = match &error {
                ShopifyError::RateLimited(secs) => Some(*secs),
                _ => None,
            };
            let delay = backoff_delay(self.retry_base, attempts, retry_after);
            warn!(
                path,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %error,
                "transient fetch failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<reqwest::Response, ShopifyError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ShopifyError::Unauthorized(
                "invalid or expired access token".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

impl RemoteFeed for RestClient {
    async fn customers_page(
        &self,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteCustomer>, ShopifyError> {
        self.entity_page("customers.json", "customers", &[], cursor)
            .await
    }

    async fn products_page(
        &self,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteProduct>, ShopifyError> {
        self.entity_page("products.json", "products", &[], cursor)
            .await
    }

    async fn orders_page(&self, cursor: Option<&str>) -> Result<Page<RemoteOrder>, ShopifyError> {
        self.entity_page("orders.json", "orders", &[("status", "any")], cursor)
            .await
    }
}

/// Whether a failure is worth retrying: rate limits, transport errors, and
/// remote 5xx. Credential failures and other 4xx are permanent.
const fn is_transient(error: &ShopifyError) -> bool {
    match error {
        ShopifyError::RateLimited(_) | ShopifyError::Http(_) => true,
        ShopifyError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Strip scheme and trailing slash from an onboarded shop domain.
fn normalize_domain(domain: &str) -> &str {
    let domain = domain.trim();
    let domain = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    domain.trim_end_matches('/')
}

/// Extract the opaque `page_info` cursor for the next page from the `Link`
/// header, if any. The token is carried verbatim, never inspected.
fn next_page_info(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        if !params.contains("rel=\"next\"") {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = url::Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(name, _)| name == "page_info")
            .map(|(_, value)| value.into_owned())
    })
}

/// Exponential backoff with jitter. `Retry-After` raises the floor when the
/// remote supplied one; the exponent is capped so the shift cannot overflow.
fn backoff_delay(base: Duration, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let shift = attempt.saturating_sub(1).min(6);
    let exponential = base.saturating_mul(1 << shift);
    let floor = retry_after_secs
        .map_or(exponential, |secs| exponential.max(Duration::from_secs(secs)));

    let jitter_cap = u64::try_from(base.as_millis()).unwrap_or(u64::MAX).max(1);
    let jitter = Duration::from_millis(rand::rng().random_range(0..jitter_cap));

    floor + jitter
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("acme.myshopify.com"), "acme.myshopify.com");
        assert_eq!(
            normalize_domain("https://acme.myshopify.com/"),
            "acme.myshopify.com"
        );
        assert_eq!(
            normalize_domain("http://acme.myshopify.com"),
            "acme.myshopify.com"
        );
        assert_eq!(
            normalize_domain("  acme.myshopify.com  "),
            "acme.myshopify.com"
        );
    }

    #[test]
    fn test_next_page_info_extracts_next_cursor() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://acme.myshopify.com/admin/api/2024-01/customers.json?limit=50&page_info=prevtok>; rel=\"previous\", \
                 <https://acme.myshopify.com/admin/api/2024-01/customers.json?limit=50&page_info=nexttok>; rel=\"next\"",
            ),
        );

        assert_eq!(next_page_info(&headers), Some("nexttok".to_string()));
    }

    #[test]
    fn test_next_page_info_absent_when_no_next_rel() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://acme.myshopify.com/admin/api/2024-01/customers.json?page_info=prevtok>; rel=\"previous\"",
            ),
        );
        assert_eq!(next_page_info(&headers), None);

        assert_eq!(next_page_info(&HeaderMap::new()), None);
    }

    #[test]
    fn test_backoff_delay_grows_exponentially() {
        let base = Duration::from_millis(100);

        let first = backoff_delay(base, 1, None);
        assert!(first >= Duration::from_millis(100) && first < Duration::from_millis(200));

        let third = backoff_delay(base, 3, None);
        assert!(third >= Duration::from_millis(400) && third < Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_delay_honors_retry_after_floor() {
        let base = Duration::from_millis(100);
        let delay = backoff_delay(base, 1, Some(7));
        assert!(delay >= Duration::from_secs(7));
        assert!(delay < Duration::from_secs(7) + Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_delay_shift_is_capped() {
        let base = Duration::from_millis(100);
        let delay = backoff_delay(base, 40, None);
        // Capped at base * 2^6 plus jitter.
        assert!(delay <= Duration::from_millis(6400) + Duration::from_millis(100));
    }

    #[test]
    fn test_is_transient_classification() {
        assert!(is_transient(&ShopifyError::RateLimited(2)));
        assert!(is_transient(&ShopifyError::Api {
            status: 503,
            body: String::new()
        }));
        assert!(!is_transient(&ShopifyError::Api {
            status: 404,
            body: String::new()
        }));
        assert!(!is_transient(&ShopifyError::Unauthorized(String::new())));
        assert!(!is_transient(&ShopifyError::Decode(String::new())));
    }

    #[test]
    fn test_factory_builds_tenant_scoped_client() {
        let factory = RestFeedFactory::new(ShopifySettings::default()).unwrap();
        let credentials = TenantCredentials {
            name: "Acme".to_string(),
            shop_domain: "https://acme.myshopify.com/".to_string(),
            access_token: SecretString::from("shpat_test"),
        };

        let client = factory.feed(&credentials);
        assert_eq!(
            client.base_url,
            "https://acme.myshopify.com/admin/api/2024-01"
        );
        assert_eq!(client.page_size, 50);
    }
}
