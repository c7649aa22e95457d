//! Historic weather lookup against the Open-Meteo archive

use actix_web::{post, web, HttpResponse};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, WeatherError};
use crate::models::{WeatherRequest, WeatherResponse};

/// Public archive endpoint
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Hourly series requested from the archive
const HOURLY_SERIES: [&str; 3] = ["temperature_2m", "precipitation", "cloud_cover"];

/// Fields of the archive response passed back to the client
#[derive(Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    hourly: Map<String, Value>,
    #[serde(default)]
    hourly_units: Map<String, Value>,
}

/// Archive API client
pub struct WeatherClient {
    http: reqwest::Client,
    url: String,
}

impl WeatherClient {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Fetches hourly series for the `days` preceding `today`, `today` included
    pub async fn fetch(
        &self,
        request: &WeatherRequest,
        today: NaiveDate,
    ) -> Result<WeatherResponse, WeatherError> {
        let start_date = today
            .checked_sub_days(Days::new(request.days.into()))
            .ok_or(WeatherError::Range(request.days))?;

        let mut query = vec![
            ("latitude", request.latitude.to_string()),
            ("longitude", request.longitude.to_string()),
            ("start_date", start_date.to_string()),
            ("end_date", today.to_string()),
        ];
        query.extend(HOURLY_SERIES.iter().map(|series| ("hourly", series.to_string())));

        let response = self.http.get(&self.url).query(&query).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(WeatherError::Upstream(status.as_u16()));
        }

        let archive: ArchiveResponse = response.json().await.map_err(WeatherError::Decode)?;
        Ok(WeatherResponse {
            latitude: request.latitude,
            longitude: request.longitude,
            days: request.days,
            weather: archive.hourly,
            weather_units: archive.hourly_units,
        })
    }
}

#[post("/weather")]
pub async fn weather(
    user: AuthenticatedUser,
    request: web::Json<WeatherRequest>,
    client: web::Data<WeatherClient>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let today = Utc::now().date_naive();

    let response = client.fetch(&request, today).await.inspect_err(|err| {
        warn!(user = %user.0.name, %err, "Weather lookup failed");
    })?;

    info!(
        user = %user.0.name,
        latitude = request.latitude,
        longitude = request.longitude,
        days = request.days,
        "Weather served"
    );
    Ok(HttpResponse::Ok().json(response))
}
