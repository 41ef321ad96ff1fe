use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::AppConfig,
    error::AppError,
    models::place::{GeocodingResponse, PlaceSearchResponse},
};

const PLACE_TYPES: &str = "place,region,locality,neighborhood,postcode";
const RESULT_LIMIT: &str = "5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin passthrough to the Mapbox forward-geocoding API.
#[derive(Clone)]
pub struct PlacesService {
    client: Client,
    access_token: Option<String>,
    api_url: Url,
}

impl PlacesService {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("coplanet/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            access_token: config.mapbox_token.clone(),
            api_url: config.mapbox_api_url.clone(),
        })
    }

    pub async fn search(&self, query: Option<&str>) -> Result<PlaceSearchResponse, AppError> {
        let query = query
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| AppError::validation("A search query is required."))?;
        let token = self.access_token.as_deref().ok_or_else(|| {
            AppError::Config("Mapbox access token is not configured on the server.".into())
        })?;

        let url = self.search_url(query)?;
        debug!("geocoding lookup for {query:?}");
        let response = self
            .client
            .get(url)
            .query(&[
                ("access_token", token),
                ("autocomplete", "true"),
                ("types", PLACE_TYPES),
                ("limit", RESULT_LIMIT),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(upstream_error)?;
        let body: GeocodingResponse = response.json().await.map_err(upstream_error)?;

        Ok(PlaceSearchResponse {
            features: body
                .features
                .into_iter()
                .filter_map(|feature| feature.into_place())
                .collect(),
        })
    }

    fn search_url(&self, query: &str) -> Result<Url, AppError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("invalid Mapbox API URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", format!("{query}.json").as_str()]);
        Ok(url)
    }
}

// The request URL carries the access token, so it is stripped before the
// error reaches logs or clients.
fn upstream_error(err: reqwest::Error) -> AppError {
    let err = err.without_url();
    warn!("geocoding request failed: {err}");
    AppError::Upstream(format!("Failed to fetch places from Mapbox: {err}"))
}
