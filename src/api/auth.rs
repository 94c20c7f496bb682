use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::ApiError;
use super::response::{ApiResponse, MessageResponse};
use super::validation::{validate_email, validate_name, validate_role};
use crate::db::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
    ResendVerificationRequest, ResetPasswordRequest, Session, User, UserResponse,
    VerifyEmailRequest,
};
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate password strength
/// Returns None if valid, or Some(error_message) if invalid
fn validate_password_strength(password: &str) -> Option<String> {
    if password.len() < 12 {
        return Some("Password must be at least 12 characters".to_string());
    }

    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !has_uppercase {
        return Some("Password must contain at least one uppercase letter".to_string());
    }
    if !has_lowercase {
        return Some("Password must contain at least one lowercase letter".to_string());
    }
    if !has_digit {
        return Some("Password must contain at least one digit".to_string());
    }
    if !has_special {
        return Some("Password must contain at least one special character".to_string());
    }

    None
}

/// Register a new guest or tenant account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    if let Err(e) = validate_email(&request.email) {
        return Err(ApiError::validation_field("email", e));
    }
    if let Err(e) = validate_name(&request.name, "Name") {
        return Err(ApiError::validation_field("name", e));
    }
    if let Some(e) = validate_password_strength(&request.password) {
        return Err(ApiError::validation_field("password", e));
    }
    let role = request.role.as_deref().unwrap_or("user");
    if let Err(e) = validate_role(role) {
        return Err(ApiError::validation_field("role", e));
    }

    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    // Email verification token, delivered out of band
    let verification_token = generate_token();
    let verification_token_hash = hash_token(&verification_token);
    let verification_expires_at = (chrono::Utc::now()
        + chrono::Duration::hours(state.config.auth.verification_hours))
    .to_rfc3339();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, name, role, is_verified,
                           verification_token_hash, verification_expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&request.email)
    .bind(&password_hash)
    .bind(&request.name)
    .bind(role)
    .bind(&verification_token_hash)
    .bind(&verification_expires_at)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    tracing::info!(email = %request.email, role = %role, "Registered new account");

    if let Err(e) = state
        .mailer
        .send_verification_email(&request.email, &request.name, &verification_token)
        .await
    {
        tracing::warn!(error = %e, "Failed to send verification email");
    }

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(UserResponse::from(user))))
}

/// Verify the email address using the token from the verification email
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    let user = user.ok_or_else(|| ApiError::bad_request("Invalid verification token"))?;

    if user.is_verified() {
        return Ok(Json(ApiResponse::new(MessageResponse::new(
            "Email already verified",
        ))));
    }

    let stored_hash = user
        .verification_token_hash
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Invalid verification token"))?;

    if hash_token(&request.token) != stored_hash {
        return Err(ApiError::bad_request("Invalid verification token"));
    }

    let expired = user
        .verification_expires_at
        .as_deref()
        .map(|t| crate::engine::is_deadline_passed(t, chrono::Utc::now()))
        .unwrap_or(true);
    if expired {
        return Err(ApiError::bad_request(
            "Verification token has expired, request a new one",
        ));
    }

    sqlx::query(
        r#"
        UPDATE users SET
            is_verified = 1,
            verification_token_hash = NULL,
            verification_expires_at = NULL,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    tracing::info!(email = %user.email, "Email verified");

    Ok(Json(ApiResponse::new(MessageResponse::new("Email verified"))))
}

/// Re-issue a verification token for an unverified account
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResendVerificationRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    // Do not reveal whether the account exists
    let message = "If the account exists, a new verification email has been sent";

    let user = match user {
        Some(u) if !u.is_verified() => u,
        _ => return Ok(Json(ApiResponse::new(MessageResponse::new(message)))),
    };

    let token = generate_token();
    let expires_at = (chrono::Utc::now()
        + chrono::Duration::hours(state.config.auth.verification_hours))
    .to_rfc3339();

    sqlx::query(
        r#"
        UPDATE users SET
            verification_token_hash = ?,
            verification_expires_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(hash_token(&token))
    .bind(&expires_at)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if let Err(e) = state
        .mailer
        .send_verification_email(&user.email, &user.name, &token)
        .await
    {
        tracing::warn!(error = %e, "Failed to send verification email");
    }

    Ok(Json(ApiResponse::new(MessageResponse::new(message))))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    // Find user by email
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    // Verify password
    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if !user.is_verified() {
        return Err(ApiError::forbidden("Email not verified"));
    }

    // Generate token
    let token = generate_token();
    let token_hash = hash_token(&token);

    let expires_at = (chrono::Utc::now()
        + chrono::Duration::days(state.config.auth.session_days))
    .to_rfc3339();

    // Create session
    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(&user.id)
    .bind(&token_hash)
    .bind(&expires_at)
    .execute(&state.db)
    .await?;

    Ok(Json(ApiResponse::new(LoginResponse {
        token,
        user: UserResponse::from(user),
    })))
}

/// Request a password reset token
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    // Do not reveal whether the account exists
    let message = "If the account exists, a reset email has been sent";

    let user = match user {
        Some(u) => u,
        None => return Ok(Json(ApiResponse::new(MessageResponse::new(message)))),
    };

    let token = generate_token();
    let expires_at = (chrono::Utc::now()
        + chrono::Duration::minutes(state.config.auth.reset_minutes))
    .to_rfc3339();

    sqlx::query(
        r#"
        UPDATE users SET
            reset_token_hash = ?,
            reset_expires_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(hash_token(&token))
    .bind(&expires_at)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if let Err(e) = state
        .mailer
        .send_password_reset_email(&user.email, &user.name, &token)
        .await
    {
        tracing::warn!(error = %e, "Failed to send reset email");
    }

    Ok(Json(ApiResponse::new(MessageResponse::new(message))))
}

/// Set a new password using a reset token; all sessions are revoked
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if let Some(e) = validate_password_strength(&request.password) {
        return Err(ApiError::validation_field("password", e));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    let user = user.ok_or_else(|| ApiError::bad_request("Invalid reset token"))?;

    let stored_hash = user
        .reset_token_hash
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Invalid reset token"))?;

    if hash_token(&request.token) != stored_hash {
        return Err(ApiError::bad_request("Invalid reset token"));
    }

    let expired = user
        .reset_expires_at
        .as_deref()
        .map(|t| crate::engine::is_deadline_passed(t, chrono::Utc::now()))
        .unwrap_or(true);
    if expired {
        return Err(ApiError::bad_request("Reset token has expired"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE users SET
            password_hash = ?,
            reset_token_hash = NULL,
            reset_expires_at = NULL,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&password_hash)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    // Revoke every open session for the account
    sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    tracing::info!(email = %user.email, "Password reset");

    Ok(Json(ApiResponse::new(MessageResponse::new("Password updated"))))
}

/// Current user profile
pub async fn me(user: User) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::new(UserResponse::from(user)))
}

/// Upload or replace the account avatar
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    user: User,
    mut multipart: axum::extract::Multipart,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let upload = super::uploads::read_file_field(&mut multipart).await?;
    let path = super::uploads::save_image(
        &state.config.server.data_dir,
        "avatars",
        &upload,
        super::uploads::IMAGE_CONTENT_TYPES,
        state.config.uploads.image_max_bytes,
    )
    .await?;

    if let Some(ref old) = user.avatar {
        super::uploads::remove_upload(&state.config.server.data_dir, old).await;
    }

    sqlx::query("UPDATE users SET avatar = ?, updated_at = ? WHERE id = ?")
        .bind(&path)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(UserResponse::from(user))))
}

/// Auth middleware that validates session tokens
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let token_hash = hash_token(&token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(&state.db)
    .await?;

    match session {
        Some(_) => Ok(next.run(request).await),
        None => Err(ApiError::unauthorized("Invalid or expired session")),
    }
}

/// Extract the bearer token from request headers
fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    // Fall back to X-API-Key header
    headers
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Get the current user from a token
pub async fn get_current_user(pool: &sqlx::SqlitePool, token: &str) -> Result<User, StatusCode> {
    let token_hash = hash_token(token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let session = session.ok_or(StatusCode::UNAUTHORIZED)?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(pool)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    user.ok_or(StatusCode::UNAUTHORIZED)
}

/// Require the tenant role on an authenticated user
pub fn ensure_tenant(user: &User) -> Result<(), ApiError> {
    if user.is_tenant() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Tenant role required"))
    }
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;
        get_current_user(&state.db, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("Str0ng!Password").unwrap();
        assert!(verify_password("Str0ng!Password", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_verify_password_rejects_bad_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("CorrectHorse9!").is_none());

        assert!(validate_password_strength("short").is_some());
        assert!(validate_password_strength("alllowercase9!!!").is_some());
        assert!(validate_password_strength("ALLUPPERCASE9!!!").is_some());
        assert!(validate_password_strength("NoDigitsHere!!!!").is_some());
        assert!(validate_password_strength("NoSpecials99999A").is_some());
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        // SHA-256 hex digest
        assert_eq!(hash_token("abc").len(), 64);
    }
}
