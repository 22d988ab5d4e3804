//! Map services: Nominatim for (reverse) geocoding, OSRM for driving directions.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use ureq::Agent;
use urlencoding::encode;

use crate::client::get_json;
use crate::error::ServiceError;
use crate::models::{Coordinate, RouteStep};
use crate::services::{DirectionsProvider, Geocoder};

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReversePlace {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<PlaceAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaceAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    pub region_code: Option<String>,
}

impl PlaceAddress {
    fn locality(&self) -> Option<&str> {
        [&self.city, &self.town, &self.village, &self.hamlet]
            .into_iter()
            .find_map(|part| non_empty(part.as_deref()))
    }

    /// Short state name: "US-CT" becomes "CT", otherwise the full state
    fn region(&self) -> Option<&str> {
        non_empty(self.region_code.as_deref())
            .and_then(|code| code.split_once('-').map(|(_, short)| short))
            .filter(|short| !short.is_empty())
            .or_else(|| non_empty(self.state.as_deref()))
    }
}

impl ReversePlace {
    /// "City, ST" > "City" > "ST" > place name
    pub fn label(&self) -> Option<String> {
        if let Some(address) = &self.address {
            match (address.locality(), address.region()) {
                (Some(city), Some(state)) => return Some(format!("{city}, {state}")),
                (Some(city), None) => return Some(city.to_string()),
                (None, Some(state)) => return Some(state.to_string()),
                (None, None) => {}
            }
        }
        non_empty(self.name.as_deref()).map(str::to_string)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Nominatim (OpenStreetMap) geocoding client
pub struct NominatimClient {
    agent: Agent,
    base_url: String,
}

impl NominatimClient {
    pub fn new(agent: Agent, base_url: &str) -> Self {
        NominatimClient {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ServiceError> {
        let url = format!(
            "{}/search?q={}&format=jsonv2&limit=1",
            self.base_url,
            encode(address)
        );
        let hits: Vec<SearchHit> = get_json(&self.agent, url).await?;

        let Some(hit) = hits.into_iter().next() else {
            debug!(address, "no geocoding match");
            return Ok(None);
        };

        let latitude = hit
            .lat
            .parse()
            .map_err(|_| ServiceError::Decode(format!("bad latitude '{}'", hit.lat)))?;
        let longitude = hit
            .lon
            .parse()
            .map_err(|_| ServiceError::Decode(format!("bad longitude '{}'", hit.lon)))?;
        Ok(Some(Coordinate::new(latitude, longitude)))
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, ServiceError> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1&zoom=10",
            self.base_url, coordinate.latitude, coordinate.longitude
        );
        // Nominatim answers {"error": ...} for open water and the like, which decodes
        // to an empty place
        let place: ReversePlace = get_json(&self.agent, url).await?;
        Ok(place.label())
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
pub struct OsrmStep {
    #[serde(default)]
    pub name: String,
    pub maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
pub struct OsrmManeuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub modifier: Option<String>,
    pub location: [f64; 2], // [longitude, latitude]
}

impl OsrmStep {
    /// Human readable instruction; the departure step has none
    pub fn instruction(&self) -> String {
        let road = self.name.trim();
        let modifier = self.maneuver.modifier.as_deref().unwrap_or("").trim();

        match self.maneuver.kind.as_str() {
            "depart" => String::new(),
            "arrive" => "Arrive at destination".to_string(),
            kind => {
                let mut text = capitalize(&kind.replace('_', " "));
                if !modifier.is_empty() {
                    text.push(' ');
                    text.push_str(modifier);
                }
                if !road.is_empty() {
                    text.push_str(" onto ");
                    text.push_str(road);
                }
                text
            }
        }
    }

    fn into_route_step(self) -> RouteStep {
        let [longitude, latitude] = self.maneuver.location;
        let instruction = self.instruction();
        RouteStep::new(Coordinate::new(latitude, longitude), instruction)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// OSRM driving directions client
pub struct OsrmClient {
    agent: Agent,
    base_url: String,
}

impl OsrmClient {
    pub fn new(agent: Agent, base_url: &str) -> Self {
        OsrmClient {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DirectionsProvider for OsrmClient {
    async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Option<Vec<RouteStep>>, ServiceError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?steps=true&overview=false",
            self.base_url,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        );
        let response: OsrmResponse = get_json(&self.agent, url).await?;

        if response.code != "Ok" {
            debug!(code = %response.code, "OSRM found no route");
            return Ok(None);
        }

        let Some(route) = response.routes.into_iter().next() else {
            return Ok(None);
        };

        let steps = route
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .map(OsrmStep::into_route_step)
            .collect();
        Ok(Some(steps))
    }
}
