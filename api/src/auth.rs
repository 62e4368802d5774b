use axum::{extract::State, http::HeaderMap, Json};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use marketplace_shared::{AuthResponse, Credentials, Role, SignUp, User};
use serde::{Deserialize, Serialize};

use crate::error::{blocking, AppError, Result};
use crate::records::Account;
use crate::AppState;

// ── Session token ──

/// The signed-in user as the client holds it. No `exp`: sessions last until
/// the client discards the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub role: Role,
}

impl Claims {
    pub fn new(user: &User) -> Self {
        Self {
            sub: user.username.clone(),
            name: user.display_name.clone(),
            role: user.role,
        }
    }

    pub fn username(&self) -> &str {
        &self.sub
    }
}

fn validation() -> Validation {
    let mut validation = Validation::default();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation
}

pub fn issue_token(user: &User, jwt_secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        &Claims::new(user),
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Unauthorized(format!("could not issue token: {e}")))
}

// ── Extract the session from the Authorization header ──

pub fn extract_session(headers: &HeaderMap, jwt_secret: &str) -> Result<Claims> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("sign in first".to_string()))?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation(),
    )
    .map_err(|_| AppError::Unauthorized("invalid session".to_string()))?;

    Ok(data.claims)
}

fn respond(account: &Account, jwt_secret: &str) -> Result<Json<AuthResponse>> {
    let user = account.to_user();
    let token = issue_token(&user, jwt_secret)?;
    Ok(Json(AuthResponse { token, user }))
}

// ── Handlers ──

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignUp>,
) -> Result<Json<AuthResponse>> {
    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() || payload.display_name.trim().is_empty() {
        return Err(AppError::Validation(
            "username, password and display name are required".to_string(),
        ));
    }

    let market = state.market.clone();
    let account = blocking(move || {
        if market.get_user(&username)?.is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        market.create_user(SignUp {
            username,
            password: payload.password,
            display_name: payload.display_name.trim().to_string(),
        })
    })
    .await?;

    respond(&account, &state.jwt_secret)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<AuthResponse>> {
    let market = state.market.clone();
    let account = blocking(move || market.authenticate(&payload.username, &payload.password))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    respond(&account, &state.jwt_secret)
}

/// GET /api/auth/me: the user the token describes
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>> {
    let claims = extract_session(&headers, &state.jwt_secret)?;
    Ok(Json(User {
        username: claims.sub,
        display_name: claims.name,
        role: claims.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn maria() -> User {
        User {
            username: "maria4b".into(),
            display_name: "4B".into(),
            role: Role::User,
        }
    }

    #[test]
    fn token_round_trips_without_expiry() {
        let token = issue_token(&maria(), "secret").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let claims = extract_session(&headers, "secret").unwrap();
        assert_eq!(claims.username(), "maria4b");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn missing_or_foreign_tokens_are_unauthorized() {
        assert!(matches!(
            extract_session(&HeaderMap::new(), "secret"),
            Err(AppError::Unauthorized(_))
        ));

        let token = issue_token(&maria(), "other-secret").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert!(extract_session(&headers, "secret").is_err());
    }
}
