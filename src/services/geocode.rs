//! ZIP code to location lookup
//!
//! Lookups never fail loudly: malformed input, HTTP errors and payloads
//! without a usable place all come back as `None`.

use crate::core::config::ApiConfig;
use crate::core::constants::USER_AGENT;
use crate::core::geo::GeoPoint;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Place a ZIP code resolves to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zip_code: String,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Keeps the digits of `raw`; anything but exactly five of them is rejected
pub fn normalize_zip(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 5).then_some(digits)
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, zip: &str) -> Option<Location>;
}

/// Response of `GET /us/{zip}`; coordinates arrive as strings
#[derive(Deserialize)]
struct ZippopotamResponse {
    #[serde(rename = "post code", default)]
    post_code: Option<String>,
    #[serde(default)]
    places: Vec<ZippopotamPlace>,
}

#[derive(Deserialize)]
struct ZippopotamPlace {
    #[serde(rename = "place name", default)]
    place_name: String,
    #[serde(rename = "state abbreviation", default)]
    state_abbreviation: String,
    latitude: String,
    longitude: String,
}

/// Turns a Zippopotam body into a [`Location`] for `zip`
pub fn parse_zippopotam(zip: &str, body: &[u8]) -> Option<Location> {
    let response: ZippopotamResponse = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(e) => {
            log::debug!("unparsable geocode body for {}: {}", zip, e);
            return None;
        }
    };

    let place = response.places.into_iter().next()?;
    let latitude = place.latitude.trim().parse::<f64>().ok()?;
    let longitude = place.longitude.trim().parse::<f64>().ok()?;

    // The service answers 0,0 for places it has no coordinates for
    if latitude == 0.0 || longitude == 0.0 {
        return None;
    }

    Some(Location {
        city: place.place_name,
        state: place.state_abbreviation,
        latitude,
        longitude,
        zip_code: response.post_code.unwrap_or_else(|| zip.to_string()),
    })
}

pub struct ZippopotamGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl ZippopotamGeocoder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: crate::tiles::loader::HTTP_CLIENT.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.geocode_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(&self, zip: &str) -> Result<Option<Vec<u8>>> {
        let url = format!("{}/us/{}", self.base_url, zip);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            log::debug!("geocode {} answered HTTP {}", zip, response.status());
            return Ok(None);
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }
}

#[async_trait]
impl Geocoder for ZippopotamGeocoder {
    async fn lookup(&self, zip: &str) -> Option<Location> {
        let Some(zip) = normalize_zip(zip) else {
            log::debug!("rejecting malformed ZIP {:?}", zip);
            return None;
        };

        match self.request(&zip).await {
            Ok(Some(body)) => {
                let location = parse_zippopotam(&zip, &body);
                if location.is_none() {
                    log::warn!("no usable place for ZIP {}", zip);
                }
                location
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("geocode lookup for {} failed: {}", zip, e);
                None
            }
        }
    }
}
