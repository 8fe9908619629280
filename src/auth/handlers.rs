use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest,
            UpdateProfileRequest,
        },
        services::{
            hash_password, is_valid_email, normalize_email, verify_password, AuthUser, JwtKeys,
        },
    },
    error::AppError,
    models::{NewUser, ProfileChanges, User},
    state::AppState,
    store::DuplicateKey,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(get_profile).put(update_profile))
}

fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

/// A concurrent writer can claim an email after the pre-check; the store's
/// uniqueness error then surfaces here.
fn reject_duplicate(err: anyhow::Error, message: &str) -> AppError {
    if err.is::<DuplicateKey>() {
        warn!(error = %err, "unique value already taken");
        AppError::invalid(message)
    } else {
        AppError::from(err)
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (Some(email), Some(password), Some(name)) = (
        required(payload.email),
        required(payload.password),
        required(payload.name),
    ) else {
        return Err(AppError::invalid("Missing data: email, password and name are required"));
    };
    let email = normalize_email(&email);
    let name = name.trim().to_string();

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::invalid("Invalid email"));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::invalid("User already exists"));
    }

    let password_hash = hash_password(&password)?;
    let user = state
        .store
        .insert_user(&NewUser {
            email,
            name,
            password_hash,
        })
        .await
        .map_err(|e| reject_duplicate(e, "User already exists"))?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: public_user(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (Some(email), Some(password)) = (required(payload.email), required(payload.password))
    else {
        return Err(AppError::invalid("Email and password are required"));
    };
    let email = normalize_email(&email);

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::invalid("Invalid credentials"));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(AppError::invalid("Invalid credentials"));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: public_user(user),
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<User>, AppError> {
    let profile = state
        .store
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = match required(payload.email) {
        Some(raw) => {
            let email = normalize_email(&raw);
            if !is_valid_email(&email) {
                return Err(AppError::invalid("Invalid email"));
            }
            if email != user.email {
                if let Some(other) = state.store.find_user_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(AppError::invalid("Email already in use"));
                    }
                }
            }
            Some(email)
        }
        None => None,
    };
    let changes = ProfileChanges {
        name: required(payload.name).map(|n| n.trim().to_string()),
        email,
    };

    state
        .store
        .update_user_profile(user.id, &changes)
        .await
        .map_err(|e| reject_duplicate(e, "Email already in use"))?;
    info!("profile updated");
    Ok(Json(MessageResponse {
        message: "Profile updated".into(),
    }))
}

fn public_user(user: User) -> PublicUser {
    PublicUser {
        id: user.id,
        name: user.name,
        email: user.email,
    }
}
