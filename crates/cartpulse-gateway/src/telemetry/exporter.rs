//! Metric exporters.
//!
//! `MetricExporter` is the seam between the periodic reader and whatever
//! carries batches to the collector. `OtlpMetricExporter` speaks OTLP over
//! gRPC, trusting only the configured CA and attaching the access token to
//! every call.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_client::MetricsServiceClient;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint, Uri};

use cartpulse_core::data::ResourceMetrics;
use cartpulse_core::error::{CartPulseError, Result};

use crate::telemetry::otlp::OtlpEncoder;

pub const ACCESS_TOKEN_HEADER: &str = "signoz-access-token";

#[async_trait]
pub trait MetricExporter: Send + Sync {
    /// Push one collected batch. Failures are per-attempt; callers do not retry.
    async fn export(&self, batch: &ResourceMetrics) -> Result<()>;
    /// Release transport resources without waiting on the collector. Later
    /// exports fail.
    async fn shutdown(&self) -> Result<()>;
}

/// Resolve the collector address. A bare `host:port` gets `https://`; any
/// other scheme is refused because the channel must be encrypted.
pub fn collector_uri(endpoint: &str) -> Result<Uri> {
    let endpoint = endpoint.trim();
    let raw = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };

    let uri: Uri = raw
        .parse()
        .map_err(|e| CartPulseError::Config(format!("invalid collector endpoint {endpoint:?}: {e}")))?;
    match uri.scheme_str() {
        Some("https") => {}
        other => {
            return Err(CartPulseError::Config(format!(
                "collector endpoint must use https (got {})",
                other.unwrap_or("none")
            )))
        }
    }
    if uri.host().is_none() {
        return Err(CartPulseError::Config(format!(
            "collector endpoint {endpoint:?} has no host"
        )));
    }
    Ok(uri)
}

pub struct OtlpMetricExporter {
    // `None` once shut down; dropping the client closes the channel.
    client: Mutex<Option<MetricsServiceClient<Channel>>>,
    token: MetadataValue<Ascii>,
    encoder: OtlpEncoder,
    uri: Uri,
}

impl OtlpMetricExporter {
    /// Build a lazily connecting channel. Nothing touches the network until
    /// the first export.
    pub fn new(endpoint: &str, access_token: &str, tls: ClientTlsConfig, timeout: Duration) -> Result<Self> {
        let uri = collector_uri(endpoint)?;

        let token: MetadataValue<Ascii> = access_token
            .parse()
            .map_err(|e| CartPulseError::Config(format!("access token is not a valid header value: {e}")))?;

        let channel = Endpoint::from(uri.clone())
            .tls_config(tls)
            .map_err(|e| CartPulseError::Config(format!("collector tls setup failed: {e}")))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect_lazy();

        let start = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        Ok(Self {
            client: Mutex::new(Some(MetricsServiceClient::new(channel))),
            token,
            encoder: OtlpEncoder::new(start),
            uri,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    fn client(&self) -> Option<MetricsServiceClient<Channel>> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MetricExporter for OtlpMetricExporter {
    async fn export(&self, batch: &ResourceMetrics) -> Result<()> {
        let mut client = self
            .client()
            .ok_or_else(|| CartPulseError::Export("exporter is shut down".into()))?;

        let body = self.encoder.encode(batch);
        let mut request = tonic::Request::new(body);
        request
            .metadata_mut()
            .insert(ACCESS_TOKEN_HEADER, self.token.clone());

        let resp = client
            .export(request)
            .await
            .map_err(|s| {
                CartPulseError::Export(format!(
                    "collector {} rejected batch: {:?} {}",
                    self.uri,
                    s.code(),
                    s.message()
                ))
            })?
            .into_inner();

        if let Some(partial) = resp.partial_success {
            if partial.rejected_data_points > 0 {
                tracing::warn!(
                    rejected = partial.rejected_data_points,
                    message = %partial.error_message,
                    "collector dropped part of the batch"
                );
            }
        }
        tracing::debug!(metrics = batch.metrics.len(), "batch exported");
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let released = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            tracing::debug!(uri = %self.uri, "collector channel released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_endpoint_gets_https() {
        let uri = collector_uri("localhost:4317").unwrap();
        assert_eq!(uri.scheme_str(), Some("https"));
        assert_eq!(uri.host(), Some("localhost"));
        assert_eq!(uri.port_u16(), Some(4317));
    }

    #[test]
    fn explicit_https_is_kept() {
        let uri = collector_uri("https://ingest.example.com:443").unwrap();
        assert_eq!(uri.host(), Some("ingest.example.com"));
    }

    #[test]
    fn plaintext_scheme_is_refused() {
        let err = collector_uri("http://localhost:4317").unwrap_err();
        assert_eq!(err.code().as_str(), "CONFIG");
    }

    #[tokio::test]
    async fn shutdown_releases_channel() {
        let exporter =
            OtlpMetricExporter::new("localhost:4317", "token", ClientTlsConfig::new(), Duration::from_secs(1))
                .unwrap();
        assert!(exporter.client().is_some());

        exporter.shutdown().await.unwrap();
        assert!(exporter.client().is_none());

        let batch = ResourceMetrics {
            resource: cartpulse_core::data::Resource::for_service("cart-test", "0.1.0"),
            scope: "cartpulse".into(),
            time_unix_nano: 1,
            metrics: vec![],
        };
        let err = exporter.export(&batch).await.unwrap_err();
        assert_eq!(err.code().as_str(), "EXPORT");
    }

    #[test]
    fn token_with_newline_is_config_error() {
        let err = OtlpMetricExporter::new("localhost:4317", "bad\ntoken", ClientTlsConfig::new(), Duration::from_secs(1))
            .err()
            .unwrap();
        assert_eq!(err.code().as_str(), "CONFIG");
    }
}
