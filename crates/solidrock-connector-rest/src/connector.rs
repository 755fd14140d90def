//! REST remote source implementation
//!
//! Implements [`RemoteSource`] over the Solidrock HTTP API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use solidrock_connector::error::{ConnectorError, ConnectorResult};
use solidrock_connector::record::RemoteRecordDetail;
use solidrock_connector::traits::RemoteSource;
use solidrock_connector::types::{Collection, RemoteRecordSummary};

use crate::config::RestConfig;

/// Remote source backed by the Solidrock HTTP API.
pub struct RestRemoteSource {
    config: RestConfig,
    display_name: String,
    client: Client,
}

impl std::fmt::Debug for RestRemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRemoteSource")
            .field("config", &self.config)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl RestRemoteSource {
    /// Create a new source with the given configuration.
    pub fn new(config: RestConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = format!("Solidrock: {}", config.base_url);
        let client = Self::build_client(&config)?;

        Ok(Self {
            config,
            display_name,
            client,
        })
    }

    /// Build the reqwest client with configuration.
    fn build_client(config: &RestConfig) -> ConnectorResult<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        if config.accept_invalid_certs {
            warn!(base_url = %config.base_url, "TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(|e| {
            ConnectorError::invalid_configuration(format!("Failed to build HTTP client: {e}"))
        })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    /// POST a form to an endpoint, retrying transient failures.
    async fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> ConnectorResult<Response> {
        let url = self.config.endpoint_url(endpoint)?;
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self.client.post(url.clone()).form(form);
            if !self.config.username.is_empty() {
                request = request.basic_auth(&self.config.username, Some(&self.config.password));
            }

            debug!(url = %url, attempt = attempt, "Sending Solidrock request");

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    debug!(url = %url, status = %status, attempt = attempt, "Received Solidrock response");

                    if retry.should_retry(status.as_u16()) && attempt <= retry.max_retries {
                        let backoff = retry.calculate_backoff(attempt);
                        warn!(
                            url = %url,
                            status = %status,
                            attempt = attempt,
                            wait_ms = backoff.as_millis(),
                            "Transient error, retrying with backoff"
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    if attempt <= retry.max_retries {
                        let backoff = retry.calculate_backoff(attempt);
                        warn!(
                            url = %url,
                            error = %e,
                            attempt = attempt,
                            wait_ms = backoff.as_millis(),
                            "Request failed, retrying with backoff"
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if e.is_timeout() {
                        return Err(ConnectorError::ConnectionTimeout {
                            timeout_secs: self.config.request_timeout_secs,
                        });
                    }
                    return Err(ConnectorError::connection_failed_with_source(
                        format!("Request failed after {attempt} attempts: {url}"),
                        e,
                    ));
                }
            }
        }
    }

    /// Check the status and decode the JSON body.
    async fn read_json(
        &self,
        collection: Collection,
        endpoint: &str,
        response: Response,
    ) -> ConnectorResult<Value> {
        let status = response.status();
        if status != StatusCode::OK {
            let reason = status.canonical_reason().unwrap_or("Unknown");
            warn!(endpoint = endpoint, status = %status, "API response error");
            return Err(ConnectorError::from_status(endpoint, status.as_u16(), reason));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ConnectorError::invalid_data(collection, format!("invalid JSON body: {e}")))
    }
}

#[async_trait]
impl RemoteSource for RestRemoteSource {
    #[instrument(skip(self), fields(source = %self.display_name))]
    async fn list_all(&self, collection: Collection) -> ConnectorResult<Vec<RemoteRecordSummary>> {
        let endpoint = collection.listing_endpoint();
        let response = self
            .post_form(endpoint, &[("apiKey", self.config.api_key.as_str())])
            .await?;
        let body = self.read_json(collection, endpoint, response).await?;

        let items = match body.get(collection.listing_key()) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ConnectorError::invalid_data(
                    collection,
                    format!("response has no '{}' list", collection.listing_key()),
                ))
            }
        };

        let mut summaries = Vec::with_capacity(items.len());
        for item in items {
            match RemoteRecordSummary::from_raw(item.clone()) {
                Some(summary) => summaries.push(summary),
                None => warn!(collection = %collection, "Skipping listing item without id"),
            }
        }

        debug!(collection = %collection, count = summaries.len(), "Listed remote records");
        Ok(summaries)
    }

    #[instrument(skip(self), fields(source = %self.display_name))]
    async fn fetch_one(
        &self,
        collection: Collection,
        id: &str,
    ) -> ConnectorResult<Option<RemoteRecordDetail>> {
        let endpoint = collection.detail_endpoint();
        let response = self
            .post_form(
                endpoint,
                &[("apiKey", self.config.api_key.as_str()), ("id", id)],
            )
            .await?;
        let body = self.read_json(collection, endpoint, response).await?;

        let detail = RemoteRecordDetail::from_body(collection, body)
            .map_err(|e| ConnectorError::invalid_data(collection, e.to_string()))?;
        if detail.is_none() {
            warn!(collection = %collection, id = id, "Detail response without record");
        }
        Ok(detail)
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
