//! Nominatim-compatible forward and reverse geocoding.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::ApiResult;
use crate::data::geometry_lines;
use crate::map::Boundary;
use crate::place::{BoundingBox, Coordinate};

/// Best forward-search match
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub coordinate: Coordinate,
    pub bounds: Option<BoundingBox>,
    pub display_name: String,
}

/// Nominatim encodes every number as a string
#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
    /// [south, north, west, east]
    #[serde(default)]
    boundingbox: Vec<String>,
}

#[derive(Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    geojson: Option<geojson::Geometry>,
}

impl NominatimPlace {
    fn into_hit(self) -> Option<SearchHit> {
        let coordinate = Coordinate::new(self.lat.parse().ok()?, self.lon.parse().ok()?);
        if !coordinate.is_valid() {
            return None;
        }
        Some(SearchHit {
            coordinate,
            bounds: parse_bounds(&self.boundingbox),
            display_name: self.display_name,
        })
    }
}

fn parse_bounds(raw: &[String]) -> Option<BoundingBox> {
    let [south, north, west, east] = raw else {
        return None;
    };
    BoundingBox::new(
        south.parse().ok()?,
        north.parse().ok()?,
        west.parse().ok()?,
        east.parse().ok()?,
    )
}

pub fn decode_search(mut body: Vec<u8>) -> ApiResult<Option<SearchHit>> {
    let places: Vec<NominatimPlace> = simd_json::serde::from_slice(&mut body)?;
    Ok(places.into_iter().find_map(NominatimPlace::into_hit))
}

pub fn decode_reverse(mut body: Vec<u8>) -> ApiResult<Option<Boundary>> {
    let reply: NominatimReverse = simd_json::serde::from_slice(&mut body)?;
    let Some(geometry) = reply.geojson else {
        return Ok(None);
    };
    let rings = geometry_lines(&geometry);
    if rings.is_empty() {
        // Point results carry no outline
        return Ok(None);
    }
    Ok(Some(Boundary {
        name: reply.display_name,
        rings,
    }))
}

pub struct Geocoder {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        // Nominatim's usage policy requires an identifying user agent
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("places-map/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Free-text search; `None` when nothing matched
    pub fn search(&self, query: &str) -> ApiResult<Option<SearchHit>> {
        debug!(query, "geocode search");
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", query), ("limit", "1")])
            .send()?
            .error_for_status()?;
        decode_search(response.bytes()?.to_vec())
    }

    /// Administrative boundary around a coordinate, if one is known
    pub fn reverse(&self, at: Coordinate) -> ApiResult<Option<Boundary>> {
        debug!(lat = at.lat, lon = at.lon, "geocode reverse");
        let lat = at.lat.to_string();
        let lon = at.lon.to_string();
        let response = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "10"),
                ("polygon_geojson", "1"),
            ])
            .send()?
            .error_for_status()?;
        decode_reverse(response.bytes()?.to_vec())
    }
}
