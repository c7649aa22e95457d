use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored credential record, keyed by `username`
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub password_hash: String,
}

/// Body of both `/register` and `/login`
#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_owned(),
        }
    }
}

/// Session token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username
    pub name: String,
    /// Expiry as a unix timestamp (seconds)
    pub exp: i64,
}

#[derive(Debug, Serialize)]
pub struct ProtectedResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// How many days back from today the archive window starts
    pub days: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub days: u32,
    pub weather: Map<String, Value>,
    pub weather_units: Map<String, Value>,
}
