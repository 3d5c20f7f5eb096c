//! Where is the user? A configured position wins, otherwise an IP lookup.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::{ApiError, ApiResult};
use crate::place::Coordinate;

#[derive(Deserialize)]
struct IpLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

pub fn decode_ip_location(mut body: Vec<u8>) -> ApiResult<Coordinate> {
    let reply: IpLocation = simd_json::serde::from_slice(&mut body)?;
    match (reply.latitude, reply.longitude) {
        (Some(lat), Some(lon)) if Coordinate::new(lat, lon).is_valid() => Ok(Coordinate::new(lat, lon)),
        _ => Err(ApiError::Rejected("IP lookup returned no position".to_string())),
    }
}

pub struct Locator {
    fixed: Option<Coordinate>,
    ip_lookup: Option<(reqwest::blocking::Client, String)>,
}

impl Locator {
    pub fn new(fixed: Option<Coordinate>, ip_lookup_url: Option<&str>, timeout: Duration) -> ApiResult<Self> {
        let ip_lookup = match ip_lookup_url {
            Some(url) => {
                let http = reqwest::blocking::Client::builder()
                    .timeout(timeout)
                    .user_agent(concat!("places-map/", env!("CARGO_PKG_VERSION")))
                    .build()?;
                Some((http, url.to_string()))
            }
            None => None,
        };
        Ok(Self { fixed, ip_lookup })
    }

    /// Configured position, if any; never touches the network
    pub fn fixed(&self) -> Option<Coordinate> {
        self.fixed
    }

    /// One-shot position request
    pub fn locate(&self) -> ApiResult<Coordinate> {
        if let Some(position) = self.fixed {
            return Ok(position);
        }
        self.locate_by_ip()
    }

    /// Coarse position from the public IP address
    pub fn locate_by_ip(&self) -> ApiResult<Coordinate> {
        let Some((http, url)) = &self.ip_lookup else {
            return Err(ApiError::Rejected("Location services are disabled".to_string()));
        };
        debug!(url = %url, "ip location lookup");
        let response = http.get(url).send()?.error_for_status()?;
        decode_ip_location(response.bytes()?.to_vec())
    }
}
