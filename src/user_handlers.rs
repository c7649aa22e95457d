use actix_web::{get, post, web, HttpResponse};
use tracing::{info, warn};

use crate::accounts::Accounts;
use crate::auth::{AuthenticatedUser, Tokens};
use crate::error::{ApiError, AuthError};
use crate::models::{Credentials, ProtectedResponse, TokenResponse};

#[post("/register")]
pub async fn register(
    data: web::Json<Credentials>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, ApiError> {
    accounts.register(&data).await?;
    Ok(HttpResponse::Ok().json("Success"))
}

#[post("/login")]
pub async fn login(
    data: web::Json<Credentials>,
    accounts: web::Data<Accounts>,
    tokens: web::Data<Tokens>,
) -> Result<HttpResponse, ApiError> {
    let username = accounts.verify(&data).await.inspect_err(|err| {
        if matches!(err, AuthError::NotFound | AuthError::BadPassword) {
            warn!(username = %data.username, %err, "Login rejected");
        }
    })?;

    let token = tokens.issue(&username)?;
    info!(%username, "User logged in");
    Ok(HttpResponse::Ok().json(TokenResponse::bearer(token)))
}

#[get("/protected")]
pub async fn protected(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(ProtectedResponse {
        message: format!("{} is authenticated.", user.0.name),
    })
}
