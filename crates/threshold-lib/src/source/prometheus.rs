//! Prometheus HTTP API sample source

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{SampleSource, SourceError};
use crate::models::{Sample, SampleSeries};

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Sample source backed by the Prometheus query API
pub struct PrometheusSource {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<ApiData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiData {
    result_type: String,
    /// Shape depends on `result_type`; decoded once the type is known
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct ApiSeries {
    /// Range query points
    #[serde(default)]
    values: Vec<Vec<Value>>,
    /// Instant query point
    #[serde(default)]
    value: Option<Vec<Value>>,
}

impl PrometheusSource {
    /// Create a source for the Prometheus server at `base_url`
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;

        let mut base_url = Url::parse(base_url.trim_end_matches('/'))?;
        // Keep any path prefix when joining API paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<ApiData, SourceError> {
        let url = self.base_url.join(path)?;

        let response = self.client.get(url).query(params).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        if body.status != "success" {
            return Err(SourceError::Query(
                body.error.unwrap_or_else(|| body.status.clone()),
            ));
        }

        body.data
            .ok_or_else(|| SourceError::Decode("response has no data".to_string()))
    }
}

#[async_trait]
impl SampleSource for PrometheusSource {
    async fn range(
        &self,
        query: &str,
        span: Duration,
        step_secs: u64,
    ) -> Result<SampleSeries, SourceError> {
        let end = Utc::now();
        let start = end - span;
        let params = [
            ("query", query.to_string()),
            ("start", unix_seconds(start)),
            ("end", unix_seconds(end)),
            ("step", format!("{}s", step_secs)),
        ];

        let data = self.get("api/v1/query_range", &params).await?;
        if data.result_type != "matrix" {
            debug!(result_type = %data.result_type, "Unexpected range result type");
            return Ok(Vec::new());
        }

        Ok(decode_series(data.result)?
            .iter()
            .flat_map(|series| series.values.iter())
            .filter_map(|pair| parse_point(pair))
            .collect())
    }

    async fn instant(&self, query: &str) -> Result<SampleSeries, SourceError> {
        let params = [("query", query.to_string())];

        let data = self.get("api/v1/query", &params).await?;
        if data.result_type != "vector" {
            debug!(result_type = %data.result_type, "Unexpected instant result type");
            return Ok(Vec::new());
        }

        Ok(decode_series(data.result)?
            .iter()
            .filter_map(|series| series.value.as_deref())
            .filter_map(parse_point)
            .collect())
    }
}

fn decode_series(result: Value) -> Result<Vec<ApiSeries>, SourceError> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(result).map_err(|e| SourceError::Decode(e.to_string()))
}

fn unix_seconds(at: DateTime<Utc>) -> String {
    format!("{:.3}", at.timestamp_millis() as f64 / 1000.0)
}

/// Parse a `[timestamp, "value"]` pair, dropping malformed or non-finite points
fn parse_point(pair: &[Value]) -> Option<Sample> {
    let [ts, value] = pair else {
        return None;
    };

    let ts = number(ts)?;
    let value = number(value)?;
    if !value.is_finite() || !ts.is_finite() {
        return None;
    }

    let secs = ts.floor();
    let nanos = ((ts - secs) * 1e9) as u32;
    let timestamp = DateTime::from_timestamp(secs as i64, nanos)?;
    Some(Sample::new(timestamp, value))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn source(url: &str) -> PrometheusSource {
        PrometheusSource::new(url, std::time::Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_point() {
        let point = parse_point(&[json!(1700000000.5), json!("42.5")]).unwrap();
        assert_eq!(point.value, 42.5);
        assert_eq!(point.timestamp.timestamp(), 1700000000);
        assert_eq!(point.timestamp.timestamp_subsec_millis(), 500);

        assert!(parse_point(&[json!(1700000000), json!("NaN")]).is_none());
        assert!(parse_point(&[json!(1700000000), json!("+Inf")]).is_none());
        assert!(parse_point(&[json!(1700000000), json!("abc")]).is_none());
        assert!(parse_point(&[json!(1700000000)]).is_none());
    }

    #[test]
    fn test_base_url_keeps_prefix() {
        let src = source("http://prom.example:9090/prometheus/");
        assert_eq!(
            src.base_url().join("api/v1/query").unwrap().as_str(),
            "http://prom.example:9090/prometheus/api/v1/query"
        );
    }

    #[tokio::test]
    async fn test_range_query_flattens_series() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query_range")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "redis_connected_clients".into()),
                Matcher::UrlEncoded("step".into(), "300s".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "success",
                    "data": {
                        "resultType": "matrix",
                        "result": [
                            {"metric": {"instance": "a"}, "values": [[1700000000, "1"], [1700000300, "2"]]},
                            {"metric": {"instance": "b"}, "values": [[1700000000, "NaN"], [1700000300, "4"]]}
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let series = source(&server.url())
            .range("redis_connected_clients", Duration::days(28), 300)
            .await
            .unwrap();

        mock.assert_async().await;
        let values: Vec<f64> = series.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 4.0]);
    }

    #[tokio::test]
    async fn test_instant_query() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), "up".into()))
            .with_status(200)
            .with_body(
                json!({
                    "status": "success",
                    "data": {
                        "resultType": "vector",
                        "result": [{"metric": {}, "value": [1700000000.123, "0.75"]}]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let series = source(&server.url()).instant("up").await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 0.75);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = source(&server.url()).instant("up").await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_failed_query_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"status": "error", "error": "parse error"}).to_string())
            .create_async()
            .await;

        let err = source(&server.url()).instant("bad(").await.unwrap_err();
        assert!(matches!(err, SourceError::Query(ref msg) if msg == "parse error"));
    }

    #[tokio::test]
    async fn test_unexpected_result_type_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({"status": "success", "data": {"resultType": "scalar", "result": [1700000000, "1"]}})
                    .to_string(),
            )
            .create_async()
            .await;

        let series = source(&server.url()).instant("1").await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_matrix_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query_range")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({"status": "success", "data": {"resultType": "matrix", "result": "oops"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = source(&server.url())
            .range("up", Duration::hours(1), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }
}
