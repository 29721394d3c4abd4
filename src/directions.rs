use geo::Point;
use geo::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::proximity::GeoPoint;

const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("directions service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("no route found between the given locations")]
    NoRoute,
}

/// An ordered driving route plus its overall length, for summaries.
#[derive(Debug, Clone)]
pub struct Route {
    pub points: Vec<GeoPoint>,
    pub miles: f64,
}

// --- Wire types (routing service contract) ---

#[derive(Serialize)]
struct RouteRequest<'a> {
    origin: &'a str,
    destination: &'a str,
}

#[derive(Deserialize)]
struct RouteResponse {
    geometry: GeoJsonLineString,
}

#[derive(Deserialize)]
struct GeoJsonLineString {
    coordinates: Vec<[f64; 2]>, // [lon, lat] standard for GeoJSON
}

/// Client for the external directions provider. Given a start/end
/// location string pair it returns the route's waypoints in driving
/// order. Lookup failures are surfaced to the caller; never retried.
pub struct DirectionsClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl DirectionsClient {
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

    pub async fn route(&self, origin: &str, destination: &str) -> Result<Route, DirectionsError> {
        let url = format!("{}/route", self.base_url);
        let resp = self
            .http_client
            .post(&url)
            .json(&RouteRequest {
                origin,
                destination,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectionsError::Status { status, body });
        }

        let parsed: RouteResponse = resp.json().await?;
        if parsed.geometry.coordinates.is_empty() {
            return Err(DirectionsError::NoRoute);
        }

        let points: Vec<GeoPoint> = parsed
            .geometry
            .coordinates
            .iter()
            .map(|&[lon, lat]| GeoPoint::new(lat, lon))
            .collect();

        Ok(Route {
            miles: route_length_miles(&points),
            points,
        })
    }
}

fn route_length_miles(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| {
            let a = Point::new(pair[0].lng, pair[0].lat);
            let b = Point::new(pair[1].lng, pair[1].lat);
            a.haversine_distance(&b)
        })
        .sum::<f64>()
        / METERS_PER_MILE
}
