use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        extractors::{AuthUser, JsonBody},
        services::AuthService,
    },
    error::{ApiError, MessageBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(profile))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthService>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if let Err(msg) = payload.validate_shape() {
        warn!(%msg, "register payload rejected");
        return Err(ApiError::bad_request(msg));
    }
    let RegisterRequest {
        name: Some(name),
        msisdn: Some(msisdn),
        password: Some(password),
    } = payload
    else {
        return Err(ApiError::bad_request("name, MSISDN and password are required"));
    };

    let (user, token) = auth
        .register(&name, &msisdn, &password)
        .await
        .map_err(|e| e.into_api("Registration Failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthService>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if let Err(msg) = payload.validate_shape() {
        warn!(%msg, "login payload rejected");
        return Err(ApiError::bad_request(msg));
    }
    let LoginRequest {
        msisdn: Some(msisdn),
        password: Some(password),
    } = payload
    else {
        return Err(ApiError::bad_request("MSISDN and password are required"));
    };

    let (user, token) = auth
        .login(&msisdn, &password)
        .await
        .map_err(|e| e.into_api("Login Failed"))?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(auth))]
pub async fn profile(
    State(auth): State<AuthService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = auth
        .get_profile(user_id)
        .await
        .map_err(|e| e.into_api("Unauthorized"))?;
    Ok(Json(user.into()))
}

/// Always 200: a missing or bogus token is not an error here.
#[instrument(skip(auth, user))]
pub async fn logout(State(auth): State<AuthService>, user: Option<AuthUser>) -> Json<MessageBody> {
    let message = auth.logout(user.map(|AuthUser(id)| id));
    Json(MessageBody {
        message: message.to_string(),
    })
}
