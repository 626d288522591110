//! `TomTom` Online Routing / Search client.
//!
//! Pedestrian routes come from `calculateRoute`, place suggestions from the
//! geocode endpoint, and points of interest from `nearbySearch`. The API key
//! travels as the `key` query parameter and is never logged.
//!
//! See <https://developer.tomtom.com/routing-api/documentation>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::{GEOCODE_LIMIT, GeocodeCandidate, NearbyPlace, ProviderError, RawRoute, RouteMode, RouteProvider};
use crate::coordinate::Coordinate;
use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.tomtom.com";

/// HTTP adapter for the `TomTom` APIs.
#[derive(Debug, Clone)]
pub struct TomTomProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl TomTomProvider {
    /// Builds a client against `base_url`.
    ///
    /// An empty or missing `api_key` is accepted; every call then fails with
    /// [`ProviderError::NotConfigured`], which routes callers onto their
    /// fallbacks without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL cannot be a base or the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidProviderUrl {
            url: base_url.to_string(),
            message,
        };

        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: parsed,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch(&self, url: Url, query: &[(&str, String)]) -> Result<String, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("TOMTOM_API_KEY is not set"))?;

        log::debug!("TomTom GET {url}");

        let resp = self
            .client
            .get(url)
            .query(&[("key", key)])
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl RouteProvider for TomTomProvider {
    async fn route(&self, start: Coordinate, end: Coordinate, mode: RouteMode) -> Result<RawRoute, ProviderError> {
        let locations = format!("{start}:{end}");
        let url = self.endpoint(&["routing", "1", "calculateRoute", &locations, "json"]);

        let body = self
            .fetch(
                url,
                &[
                    ("routeType", mode.to_string()),
                    ("traffic", "true".to_string()),
                    ("travelMode", "pedestrian".to_string()),
                ],
            )
            .await?;

        parse_route(&body)
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let file = format!("{query}.json");
        let url = self.endpoint(&["search", "2", "geocode", &file]);

        let body = self.fetch(url, &[("limit", GEOCODE_LIMIT.to_string())]).await?;
        parse_geocode(&body)
    }

    async fn nearby(&self, center: Coordinate, category: &str, radius_m: u32) -> Result<Vec<NearbyPlace>, ProviderError> {
        let url = self.endpoint(&["search", "2", "nearbySearch", ".json"]);

        let body = self
            .fetch(
                url,
                &[
                    ("lat", center.lat.to_string()),
                    ("lon", center.lng.to_string()),
                    ("radius", radius_m.to_string()),
                    ("categorySet", category.to_string()),
                ],
            )
            .await?;

        parse_nearby(&body)
    }
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CalculateRouteResponse {
    #[serde(default)]
    routes: Vec<RouteDto>,
}

#[derive(Deserialize)]
struct RouteDto {
    summary: SummaryDto,
    #[serde(default)]
    legs: Vec<LegDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDto {
    length_in_meters: f64,
    travel_time_in_seconds: f64,
}

#[derive(Deserialize)]
struct LegDto {
    #[serde(default)]
    points: Vec<PointDto>,
}

#[derive(Deserialize)]
struct PointDto {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressDto {
    freeform_address: Option<String>,
    country: Option<String>,
    municipality: Option<String>,
}

#[derive(Deserialize)]
struct PositionDto {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct GeocodeResultDto {
    id: String,
    address: AddressDto,
    position: PositionDto,
    #[serde(default)]
    score: f64,
}

#[derive(Deserialize)]
struct PoiDto {
    name: String,
}

#[derive(Deserialize)]
struct NearbyResultDto {
    id: String,
    poi: Option<PoiDto>,
    address: Option<AddressDto>,
    position: PositionDto,
    #[serde(default)]
    dist: f64,
}

fn malformed(err: &serde_json::Error) -> ProviderError {
    ProviderError::Malformed {
        message: err.to_string(),
    }
}

/// Flattens `routes[0].legs[].points[]` into one geometry.
fn parse_route(body: &str) -> Result<RawRoute, ProviderError> {
    let response: CalculateRouteResponse = serde_json::from_str(body).map_err(|e| malformed(&e))?;

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(ProviderError::Empty { what: "routes" })?;

    let points = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.points)
        .map(|p| Coordinate::new(p.latitude, p.longitude))
        .collect();

    Ok(RawRoute {
        points,
        length_in_meters: route.summary.length_in_meters,
        travel_time_in_seconds: route.summary.travel_time_in_seconds,
    })
}

fn parse_geocode(body: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
    let response: SearchResponse<GeocodeResultDto> = serde_json::from_str(body).map_err(|e| malformed(&e))?;

    let mut candidates: Vec<GeocodeCandidate> = response
        .results
        .into_iter()
        .map(|r| GeocodeCandidate {
            id: r.id,
            address: r.address.freeform_address.unwrap_or_default(),
            country: r.address.country,
            municipality: r.address.municipality,
            coordinate: Coordinate::new(r.position.lat, r.position.lon),
            relevance: r.score,
        })
        .collect();

    candidates.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    candidates.truncate(GEOCODE_LIMIT);
    Ok(candidates)
}

fn parse_nearby(body: &str) -> Result<Vec<NearbyPlace>, ProviderError> {
    let response: SearchResponse<NearbyResultDto> = serde_json::from_str(body).map_err(|e| malformed(&e))?;

    Ok(response
        .results
        .into_iter()
        .map(|r| NearbyPlace {
            id: r.id,
            name: r.poi.map(|p| p.name).unwrap_or_default(),
            address: r.address.and_then(|a| a.freeform_address),
            coordinate: Coordinate::new(r.position.lat, r.position.lon),
            distance_meters: r.dist,
        })
        .collect())
}
