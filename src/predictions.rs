use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::proximity::{AccidentPoint, GeoPoint};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("prediction service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// One record from the prediction service. Field casing follows the
/// service's payload (US-Accidents column names).
#[derive(Debug, Deserialize)]
struct PredictionRecord {
    #[serde(rename = "Start_Lat")]
    start_lat: f64,
    #[serde(rename = "Start_Lng")]
    start_lng: f64,
    /// The service is loose here: a bool, a 0/1 number, or absent.
    #[serde(default)]
    prediction: serde_json::Value,
}

impl PredictionRecord {
    fn fired(&self) -> bool {
        match &self.prediction {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            serde_json::Value::String(s) => !s.is_empty(),
            _ => false,
        }
    }
}

/// Client for the remote accident-prediction service. Queried with the
/// same location pair as the directions lookup; returns every record as
/// an `AccidentPoint`, flagged by whether its prediction fired. Callers
/// log failures and carry on with an empty set; there is no retry.
pub struct PredictionClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl PredictionClient {
    pub fn new(base_url: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub async fn accident_locations(
        &self,
        start_location: &str,
        end_location: &str,
    ) -> Result<Vec<AccidentPoint>, PredictionError> {
        let url = format!("{}/api/getAccidentLocations", self.base_url);
        let resp = self
            .http_client
            .get(&url)
            .query(&[
                ("startLocation", start_location),
                ("endLocation", end_location),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PredictionError::Status { status, body });
        }

        let records: Vec<PredictionRecord> = resp.json().await?;
        Ok(records
            .into_iter()
            .map(|record| AccidentPoint {
                point: GeoPoint::new(record.start_lat, record.start_lng),
                is_accident: record.fired(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::{Json, Router, http::StatusCode, routing::get};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn maps_records_and_prediction_truthiness() {
        let app = Router::new().route(
            "/api/getAccidentLocations",
            get(|| async {
                Json(serde_json::json!([
                    { "Start_Lat": 40.7061, "Start_Lng": -74.0088, "prediction": 1 },
                    { "Start_Lat": 40.7310, "Start_Lng": -73.9970, "prediction": 0 },
                    { "Start_Lat": 40.7412, "Start_Lng": -73.9896, "prediction": true },
                    { "Start_Lat": 40.7580, "Start_Lng": -73.9855 }
                ]))
            }),
        );
        let base = serve(app).await;

        let points = PredictionClient::new(&base)
            .accident_locations("Wall Street", "Times Square")
            .await
            .unwrap();

        assert_eq!(points.len(), 4);
        let flags: Vec<bool> = points.iter().map(|p| p.is_accident).collect();
        assert_eq!(flags, vec![true, false, true, false]);
        assert_eq!(points[0].point, GeoPoint::new(40.7061, -74.0088));
    }

    #[tokio::test]
    async fn passes_the_location_pair_as_query_params() {
        let app = Router::new().route(
            "/api/getAccidentLocations",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("startLocation").unwrap(), "Wall Street");
                assert_eq!(params.get("endLocation").unwrap(), "Times Square");
                Json(serde_json::json!([]))
            }),
        );
        let base = serve(app).await;

        let points = PredictionClient::new(&base)
            .accident_locations("Wall Street", "Times Square")
            .await
            .unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn service_error_is_surfaced() {
        let app = Router::new().route(
            "/api/getAccidentLocations",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = serve(app).await;

        let err = PredictionClient::new(&base)
            .accident_locations("a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::Status { .. }));
    }
}
