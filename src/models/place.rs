use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subset of a Mapbox geocoding feature that the search endpoint forwards.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingFeature {
    pub id: Option<String>,
    pub place_name: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub center: Vec<Value>,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub features: Vec<GeocodingFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub id: Option<String>,
    pub place_name: Option<String>,
    pub text: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub context: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceSearchResponse {
    pub features: Vec<Place>,
}

impl GeocodingFeature {
    /// `center` is `[longitude, latitude]`; features without both are dropped.
    pub fn into_place(self) -> Option<Place> {
        let longitude = self.center.first()?.as_f64()?;
        let latitude = self.center.get(1)?.as_f64()?;
        Some(Place {
            id: self.id,
            place_name: self.place_name,
            text: self.text,
            latitude,
            longitude,
            context: self.context.unwrap_or_else(|| Value::Array(Vec::new())),
        })
    }
}
