use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{required, LoginRequest, LoginResponse, SignupRequest, SignupResponse},
        jwt::{AuthUser, JwtKeys},
        repo_types::{NewUser, User},
    },
    error::ApiError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let (Some(name), Some(email), Some(password)) = (
        required(payload.name),
        required(payload.email).map(|e| e.to_lowercase()),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };

    let identity = state
        .identity
        .create_user(&email, &password, true)
        .await
        .map_err(|e| {
            warn!(error = %e, %email, "identity provider refused signup");
            ApiError::auth(
                StatusCode::BAD_REQUEST,
                e.provider_message().unwrap_or("Signup failed"),
            )
        })?;

    let profile = state
        .profiles
        .insert(NewUser {
            id: identity.id,
            name: &name,
            email: &email,
        })
        .await;

    let profile = match profile {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, user_id = %identity.id, "profile insert failed; removing identity");
            if let Err(cleanup) = state.identity.delete_user(identity.id).await {
                error!(error = %cleanup, user_id = %identity.id, "orphaned identity left behind");
            }
            return Err(ApiError::storage(e));
        }
    };

    info!(user_id = %profile.id, email = %profile.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: identity.id,
            email: identity.email,
            name: profile.name,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        required(payload.email).map(|e| e.to_lowercase()),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("Email and password are required"));
    };

    let identity = state
        .identity
        .sign_in(&email, &password)
        .await
        .map_err(|e| {
            warn!(error = %e, %email, "login rejected");
            ApiError::auth(
                StatusCode::UNAUTHORIZED,
                e.provider_message().unwrap_or("Invalid credentials"),
            )
        })?;

    let user = state
        .profiles
        .find_by_id(identity.id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| {
            warn!(user_id = %identity.id, "authenticated identity has no profile");
            ApiError::not_found("User profile not found")
        })?;

    let access_token = JwtKeys::from_ref(&state)
        .sign(user.id)
        .map_err(ApiError::Server)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user,
        access_token,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = state
        .profiles
        .find_by_id(user_id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::not_found("User profile not found"))?;
    Ok(Json(user))
}
