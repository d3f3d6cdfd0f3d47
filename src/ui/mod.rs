// Server-rendered pages
// Uses Askama templates; the accounts page talks to the JSON /predict API from static/script.js

mod templates;

use askama::Template;
use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use rust_embed::RustEmbed;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::auth::{
    end_session, hash_password, session_user_id, start_session, verify_password, CurrentUser,
};
use crate::api::error::{is_unique_violation, ApiError};
use crate::api::metrics::{record_auth_attempt, record_prediction};
use crate::api::validation::{prediction_text, validate_signup};
use crate::classifier::Label;
use crate::db::{LoginRequest, SignupRequest, User};
use crate::AppState;

pub use templates::*;

const FLASH_COOKIE: &str = "mayanetra_flash";
const VERSION: &str = env!("CARGO_PKG_VERSION");

const EMPTY_TEXT_MESSAGE: &str = "⚠️ Please enter some text.";
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const ACCOUNT_EXISTS: &str = "Username or email already exists.";

#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e)).into_response(),
    }
}

/// Label shown on the stateless demo page
pub fn demo_label(label: Label) -> &'static str {
    match label {
        Label::Ai => "🤖 AI-generated",
        Label::Human => "📝 Human-written",
    }
}

pub fn demo_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(demo_index))
        .route("/predict", post(demo_predict))
}

pub fn accounts_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/signup", get(signup_page).post(signup_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout))
}

/// GET /static/*path
pub async fn static_asset(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref().to_string())], file.data).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// Flash messages live in a signed cookie and are consumed by the next page render

fn set_flash(jar: SignedCookieJar, flash: &Flash) -> SignedCookieJar {
    let value = match serde_json::to_string(flash) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Failed to encode flash message");
            return jar;
        }
    };
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}

fn take_flash(jar: SignedCookieJar) -> (SignedCookieJar, Option<Flash>) {
    match jar.get(FLASH_COOKIE) {
        Some(cookie) => {
            let flash = serde_json::from_str(cookie.value()).ok();
            (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
        }
        None => (jar, None),
    }
}

fn cookie_jar(state: &AppState, headers: &HeaderMap) -> SignedCookieJar {
    SignedCookieJar::from_headers(headers, state.cookie_key.clone())
}

// Demo page
async fn demo_index() -> Response {
    render_template(DemoTemplate {
        text: String::new(),
        result: None,
        error: None,
        version: VERSION.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct DemoForm {
    #[serde(default)]
    text: String,
}

// Demo predict: re-renders the page with the verdict inline
async fn demo_predict(
    State(state): State<Arc<AppState>>,
    form: Result<Form<DemoForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(f)| f).unwrap_or_default();

    let mut page = DemoTemplate {
        text: form.text.clone(),
        result: None,
        error: None,
        version: VERSION.to_string(),
    };

    let Some(text) = prediction_text(&form.text) else {
        page.error = Some(EMPTY_TEXT_MESSAGE.to_string());
        return render_template(page);
    };

    match state.detector() {
        Ok(detector) => {
            let verdict = detector.predict(text);
            record_prediction(verdict.label);
            page.result = Some(demo_label(verdict.label).to_string());
            render_template(page)
        }
        Err(e) => {
            page.error = Some(format!("⚠️ {}.", e.message()));
            (StatusCode::INTERNAL_SERVER_ERROR, render_template(page)).into_response()
        }
    }
}

// Main page for a logged-in user
async fn index(CurrentUser(user): CurrentUser) -> Response {
    render_template(IndexTemplate {
        username: user.username,
        version: VERSION.to_string(),
    })
}

// Signup page
async fn signup_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (jar, flash) = take_flash(cookie_jar(&state, &headers));
    let page = SignupTemplate {
        flash,
        username: String::new(),
        email: String::new(),
        version: VERSION.to_string(),
    };
    (jar, render_template(page)).into_response()
}

// Signup submit
async fn signup_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<SignupRequest>, FormRejection>,
) -> Result<Response, ApiError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let username = form.username.trim();
    let email = form.email.trim();

    let rerender = |message: String| {
        render_template(SignupTemplate {
            flash: Some(Flash::error(message)),
            username: username.to_string(),
            email: email.to_string(),
            version: VERSION.to_string(),
        })
    };

    if let Err(message) = validate_signup(username, email, form.password.trim()) {
        record_auth_attempt("signup", "invalid");
        return Ok(rerender(message));
    }

    let db = state.db()?;
    if User::username_or_email_taken(db, username, email).await? {
        record_auth_attempt("signup", "duplicate");
        return Ok(rerender(ACCOUNT_EXISTS.to_string()));
    }

    let password_hash = hash_password(&form.password).map_err(|e| {
        warn!(error = %e, "Password hashing failed");
        ApiError::internal("Failed to create account")
    })?;

    // The UNIQUE constraints still catch a concurrent signup for the same name
    let user = match User::create(db, username, email, &password_hash).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            record_auth_attempt("signup", "duplicate");
            return Ok(rerender(ACCOUNT_EXISTS.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, username = %user.username, "Account created");
    record_auth_attempt("signup", "success");

    let jar = set_flash(
        cookie_jar(&state, &headers),
        &Flash::success("Account created! Please log in."),
    );
    Ok((jar, Redirect::to("/login")).into_response())
}

// Login page
async fn login_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let mut jar = cookie_jar(&state, &headers);
    if let Some(user_id) = session_user_id(&jar) {
        if User::find_by_id(state.db()?, user_id).await?.is_some() {
            return Ok(Redirect::to("/").into_response());
        }
        // Signed but stale: drop it so the form is reachable
        jar = end_session(jar);
    }

    let (jar, flash) = take_flash(jar);
    let page = LoginTemplate {
        flash,
        email: String::new(),
        version: VERSION.to_string(),
    };
    Ok((jar, render_template(page)).into_response())
}

// Login submit
async fn login_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<LoginRequest>, FormRejection>,
) -> Result<Response, ApiError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let email = form.email.trim();

    let rerender = |message: &str| {
        render_template(LoginTemplate {
            flash: Some(Flash::error(message)),
            email: email.to_string(),
            version: VERSION.to_string(),
        })
    };

    if email.is_empty() || form.password.is_empty() {
        record_auth_attempt("login", "invalid");
        return Ok(rerender("Email and password are required."));
    }

    let db = state.db()?;
    let user = match User::find_by_email(db, email).await? {
        Some(user) if verify_password(&form.password, &user.password_hash) => user,
        _ => {
            info!("Failed login attempt");
            record_auth_attempt("login", "failure");
            return Ok(rerender(INVALID_CREDENTIALS));
        }
    };

    info!(user_id = user.id, "User logged in");
    record_auth_attempt("login", "success");

    let jar = start_session(
        cookie_jar(&state, &headers),
        &user,
        state.config.auth.session_ttl_days,
    );
    Ok((jar, Redirect::to("/")).into_response())
}

// Logout
async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Response {
    info!(user_id = user.id, "User logged out");
    let jar = end_session(cookie_jar(&state, &headers));
    (jar, Redirect::to("/login")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    #[test]
    fn test_demo_labels() {
        assert_eq!(demo_label(Label::Ai), "🤖 AI-generated");
        assert_eq!(demo_label(Label::Human), "📝 Human-written");
    }

    #[test]
    fn test_flash_round_trip() {
        let key = Key::from(&[7u8; 64]);
        let jar = SignedCookieJar::new(key);

        let jar = set_flash(jar, &Flash::success("Account created! Please log in."));
        let (jar, flash) = take_flash(jar);
        assert_eq!(flash, Some(Flash::success("Account created! Please log in.")));

        // Consumed
        let (_, flash) = take_flash(jar);
        assert_eq!(flash, None);
    }

    #[test]
    fn test_demo_template_escapes_input() {
        let html = DemoTemplate {
            text: "<script>alert(1)</script>".to_string(),
            result: Some(demo_label(Label::Human).to_string()),
            error: None,
            version: VERSION.to_string(),
        }
        .render()
        .unwrap();

        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("📝 Human-written"));
    }

    #[test]
    fn test_index_page_has_editor_tools_and_history() {
        let html = IndexTemplate {
            username: "ada".to_string(),
            version: VERSION.to_string(),
        }
        .render()
        .unwrap();

        for id in [
            "word-count",
            "char-count",
            "sample-btn",
            "copy-btn",
            "clear-btn",
            "meter",
            "history-list",
            "save-history",
            "theme-toggle",
            "toast",
        ] {
            assert!(html.contains(&format!("id=\"{}\"", id)), "missing #{}", id);
        }
        assert!(html.contains("/static/script.js"));

        let script = Assets::get("script.js").unwrap();
        let script = std::str::from_utf8(&script.data).unwrap();
        assert!(script.contains("mayanetra-history"));
        assert!(script.contains("mayanetra-theme"));
        assert!(script.contains("navigator.clipboard"));
    }

    #[test]
    fn test_demo_page_posts_without_json_handler() {
        let html = DemoTemplate {
            text: String::new(),
            result: None,
            error: None,
            version: VERSION.to_string(),
        }
        .render()
        .unwrap();

        assert!(html.contains("method=\"post\""));
        assert!(html.contains("id=\"word-count\""));
        assert!(!html.contains("id=\"predict-form\""));
    }

    #[test]
    fn test_embedded_assets_present() {
        assert!(Assets::get("script.js").is_some());
        assert!(Assets::get("style.css").is_some());
        assert!(Assets::get("missing.txt").is_none());
    }
}
