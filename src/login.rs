#![cfg(feature = "web")]

use crate::app::{self, AppState};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Name of the cookie carrying the session ID
pub const SESSION_COOKIE: &str = "session";

/// Why a login attempt was refused
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LoginError {
    #[error("Please enter both a student ID and a password.")]
    MissingCredentials,

    #[error("The student ID or password is incorrect.")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Login form fields
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub student_id: String,

    #[serde(default)]
    pub password: String,
}

/// Shared-secret login check
///
/// Only an Argon2 hash of the secret is kept. Any non-empty student ID is
/// accepted together with the right secret; there are no per-student credentials.
pub struct AccessGate {
    password_hash: String,
}

impl AccessGate {
    /// Hash the shared secret with a fresh random salt
    ///
    /// # Arguments
    /// * `secret` - The plaintext password every student logs in with
    ///
    /// # Returns
    /// * `Result<AccessGate, LoginError>` - The gate, or `LoginError::Hashing`
    pub fn new(secret: &str) -> Result<Self, LoginError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| LoginError::Hashing(e.to_string()))?
            .to_string();
        Ok(AccessGate { password_hash })
    }

    /// Check a login attempt
    ///
    /// Both fields are trimmed before checking.
    ///
    /// # Returns
    /// * `Result<String, LoginError>` - The trimmed student ID on success
    ///
    /// # Errors
    /// * `LoginError::MissingCredentials` if either field is blank
    /// * `LoginError::InvalidCredentials` if the password does not match
    pub fn authenticate(&self, student_id: &str, password: &str) -> Result<String, LoginError> {
        let student_id = student_id.trim();
        let password = password.trim();
        if student_id.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|e| LoginError::Hashing(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(student_id.to_string()),
            Err(_) => Err(LoginError::InvalidCredentials),
        }
    }
}

/// Per-browser state
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Identifier of the logged-in student
    pub student_id: String,

    /// Rank of the card whose detail scores are open
    pub expanded: Option<u32>,

    expires_at: SystemTime,
}

/// Authenticated session, attached to dashboard requests by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: String,
    pub student_id: String,
    pub expanded: Option<u32>,
}

/// All live sessions, keyed by session ID
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionContext>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    /// Start a session for a student and return its ID
    pub fn create(&self, student_id: &str) -> String {
        let session_id = Uuid::new_v4().to_string();
        let context = SessionContext {
            student_id: student_id.to_string(),
            expanded: None,
            expires_at: SystemTime::now() + self.lifetime,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, s| s.expires_at > SystemTime::now());
        sessions.insert(session_id.clone(), context);
        session_id
    }

    /// Look up a session that has not expired
    pub fn get(&self, session_id: &str) -> Option<SessionContext> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(session_id)
            .filter(|s| s.expires_at > SystemTime::now())
            .cloned()
    }

    /// Open the detail scores of `rank`, or close them if already open
    ///
    /// # Returns
    /// * `Option<Option<u32>>` - The new selection, `None` if the session is unknown
    pub fn toggle_expanded(&self, session_id: &str, rank: u32) -> Option<Option<u32>> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let context = sessions.get_mut(session_id)?;
        context.expanded = if context.expanded == Some(rank) {
            None
        } else {
            Some(rank)
        };
        Some(context.expanded)
    }

    /// Drop a session, forgetting its identity and selection
    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Resolve the session named by the request's cookie
pub fn current_session(state: &AppState, jar: &CookieJar) -> Option<(String, SessionContext)> {
    let session_id = jar.get(SESSION_COOKIE)?.value().to_string();
    let context = state.sessions.get(&session_id)?;
    Some((session_id, context))
}

/// Serve the login page
///
/// A browser that is already logged in goes straight to the dashboard.
pub async fn serve_login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if current_session(&state, &jar).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    login_page(&state, StatusCode::OK, None, "")
}

/// Handle login form submissions
///
/// Success starts a session and redirects to the dashboard. A refused attempt
/// re-renders the form and leaves every session untouched.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.gate.authenticate(&form.student_id, &form.password) {
        Ok(student_id) => {
            if let Some((old_id, _)) = current_session(&state, &jar) {
                state.sessions.remove(&old_id);
            }
            let session_id = state.sessions.create(&student_id);
            log::info!("student {} logged in", student_id);
            (jar.add(session_cookie(session_id)), Redirect::to("/dashboard")).into_response()
        }
        Err(e @ LoginError::MissingCredentials) => {
            login_page(&state, StatusCode::BAD_REQUEST, Some(e.to_string()), &form.student_id)
        }
        Err(e @ LoginError::InvalidCredentials) => {
            log::info!("rejected login for student {}", form.student_id.trim());
            login_page(&state, StatusCode::UNAUTHORIZED, Some(e.to_string()), &form.student_id)
        }
        Err(e) => {
            log::error!("login failed: {}", e);
            login_page(
                &state,
                StatusCode::INTERNAL_SERVER_ERROR,
                Some("Login is temporarily unavailable.".to_string()),
                &form.student_id,
            )
        }
    }
}

/// Handle logout
///
/// Clears the session and its cookie, then redirects to the login page.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
}

/// Authentication middleware
///
/// Lets the request through with an [`AuthSession`] extension when the
/// session cookie is valid, and redirects to the login page otherwise.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match current_session(&state, &jar) {
        Some((session_id, context)) => {
            request.extensions_mut().insert(AuthSession {
                session_id,
                student_id: context.student_id,
                expanded: context.expanded,
            });
            next.run(request).await
        }
        None => Redirect::to("/login").into_response(),
    }
}

fn login_page(state: &AppState, status: StatusCode, error: Option<String>, student_id: &str) -> Response {
    let data = serde_json::json!({
        "error": error,
        "form_student_id": student_id.trim(),
    });
    let mut response = app::render(state, "login", &data);
    if response.status() == StatusCode::OK {
        *response.status_mut() = status;
    }
    response
}
