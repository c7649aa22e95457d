//! Routing and shared request state

use actix_web::web::{self, Data, ServiceConfig};

use crate::accounts::Accounts;
use crate::auth::Tokens;
use crate::config::Config;
use crate::db::UserStore;
use crate::error::ApiError;
use crate::user_handlers::{login, protected, register};
use crate::weather::{self, WeatherClient};


/// Components shared by all workers
#[derive(Clone)]
pub struct AppState {
    accounts: Data<Accounts>,
    tokens: Data<Tokens>,
    weather: Data<WeatherClient>,
}

impl AppState {
    pub fn new(accounts: Accounts, tokens: Tokens, weather: WeatherClient) -> Self {
        Self {
            accounts: Data::new(accounts),
            tokens: Data::new(tokens),
            weather: Data::new(weather),
        }
    }

    /// Builds the state from configuration over an opened store
    pub fn with_config(config: &Config, store: UserStore) -> Result<Self, reqwest::Error> {
        let auth = &config.auth;
        let accounts = Accounts::new(store, auth.password_policy.clone(), auth.bcrypt_cost);
        let tokens = Tokens::new(&auth.jwt_secret, auth.token_ttl);
        let weather = WeatherClient::new(config.weather_api_url.as_str())?;

        Ok(Self::new(accounts, tokens, weather))
    }
}

/// Returns configuration function for the ActixWeb services
pub fn configure(state: AppState) -> impl Fn(&mut ServiceConfig) + Clone {
    move |cfg: &mut ServiceConfig| {
        let json = web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::from(err).into());

        cfg.app_data(json)
            .app_data(state.accounts.clone())
            .app_data(state.tokens.clone())
            .app_data(state.weather.clone())
            .service(register)
            .service(login)
            .service(protected)
            .service(weather::weather);
    }
}
