use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::GeocoderConfig;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder is not configured")]
    NotConfigured,
    #[error("geocoder request failed: {0}")]
    Upstream(String),
    #[error("no location found for '{0}'")]
    NoMatch(String),
}

/// One resolved address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub street: String,
    pub city: String,
    pub state_code: String,
    pub zipcode: String,
    pub country_code: String,
}

impl GeoLocation {
    /// GeoJSON point document stored on a bootcamp; coordinates are `[lng, lat]`.
    pub fn to_point(&self) -> Value {
        json!({
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
            "formattedAddress": self.formatted_address,
            "street": self.street,
            "city": self.city,
            "state": self.state_code,
            "zipcode": self.zipcode,
            "country": self.country_code,
        })
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Vec<GeoLocation>, GeocodeError>;

    /// First match or `NoMatch`.
    async fn locate(&self, address: &str) -> Result<GeoLocation, GeocodeError> {
        self.geocode(address)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoMatch(address.to_string()))
    }
}

/// MapQuest geocoding API client.
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let api_key = config.api_key.clone().ok_or(GeocodeError::NotConfigured)?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: String,
    #[serde(default)]
    admin_area5: String,
    #[serde(default)]
    admin_area3: String,
    #[serde(default)]
    admin_area1: String,
    #[serde(default)]
    postal_code: String,
}

#[derive(Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl From<MapQuestLocation> for GeoLocation {
    fn from(loc: MapQuestLocation) -> Self {
        let region = format!("{} {}", loc.admin_area3, loc.postal_code);
        let formatted_address = [loc.street.as_str(), loc.admin_area5.as_str(), region.trim(), loc.admin_area1.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        GeoLocation {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address,
            street: loc.street,
            city: loc.admin_area5,
            state_code: loc.admin_area3,
            zipcode: loc.postal_code,
            country_code: loc.admin_area1,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Vec<GeoLocation>, GeocodeError> {
        debug!("Geocoding '{}'", address);
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("Geocoder request failed: {}", e);
                GeocodeError::Upstream(e.to_string())
            })?;

        let body: MapQuestResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Upstream(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .map(GeoLocation::from)
            .collect())
    }
}

/// Fixed lookup table keyed by the exact address or zipcode string.
#[derive(Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, location: GeoLocation) -> Self {
        self.entries.insert(key.into(), location);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Vec<GeoLocation>, GeocodeError> {
        Ok(self.entries.get(address).cloned().into_iter().collect())
    }
}
