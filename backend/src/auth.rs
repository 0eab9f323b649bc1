use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use bcrypt::{hash, verify, DEFAULT_COST};
use common::{Credentials, LoginStatus, OkResponse, SessionUser};
use validator::Validate;

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::web_server::AppState;

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "session";

#[derive(sqlx::FromRow, Debug)]
struct UserRecord {
    id: i64,
    username: String,
    password_hash: String,
}

fn session_cookie(token: String, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(ttl_hours))
        .build()
}

// --- API Handlers ---

/// ## Register a new user
/// Hashes the password and inserts the user. Uniqueness is left to the
/// `users.username` constraint so there is no check-then-insert race.
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<Credentials>, AppError>,
) -> Result<Json<OkResponse>, AppError> {
    payload.validate()?;

    tracing::info!("Register attempt for {}", payload.username);

    let password_hash = hash(&payload.password, DEFAULT_COST)?;

    sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(&payload.username)
        .bind(&password_hash)
        .execute(&state.db_pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::DuplicateUsername
            }
            _ => AppError::from(e),
        })?;

    tracing::info!("New user registered: {}", payload.username);
    Ok(Json(OkResponse { success: true }))
}

/// ## Login an existing user
/// An unknown username and a wrong password produce the exact same
/// response, so the API never reveals which half was wrong.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<Credentials>, AppError>,
) -> Result<(CookieJar, Json<OkResponse>), AppError> {
    payload.validate()?;

    tracing::info!("Login attempt for {}", payload.username);

    let user: UserRecord =
        sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(&payload.username)
            .fetch_optional(&state.db_pool)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

    if !verify(&payload.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.sessions.create(SessionUser {
        id: user.id,
        username: user.username.clone(),
    });

    tracing::info!("User logged in: {}", user.username);
    let jar = jar.add(session_cookie(token, state.config.session.ttl_hours));
    Ok((jar, Json(OkResponse { success: true })))
}

/// ## Logout
/// Destroys whatever session the cookie points at and clears the
/// cookie. Always succeeds, even without an active session.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<OkResponse>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value());
        tracing::info!("Session destroyed on logout");
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(OkResponse { success: true }))
}

/// ## Check login state
/// Reports whether the request carries a live session, and for whom.
pub async fn check_login(State(state): State<AppState>, jar: CookieJar) -> Json<LoginStatus> {
    let user = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.resolve(cookie.value()));

    Json(LoginStatus {
        logged_in: user.is_some(),
        user,
    })
}

// --- Middleware for session authentication ---

/// Gate for mutating routes: resolves the session cookie and stashes
/// the user in the request extensions, or rejects with 401 before the
/// handler runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or(AppError::Unauthorized)?;

    let user = state.sessions.resolve(&token).ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
    });

    Ok(next.run(request).await)
}
