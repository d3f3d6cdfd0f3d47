// Askama template definitions

use askama::Template;
use serde::{Deserialize, Serialize};

/// Severity of a one-shot flash message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashKind::Success => "flash-success",
            FlashKind::Error => "flash-error",
        }
    }
}

// Message shown once on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

// Stateless demo page: form plus the inline result
#[derive(Template)]
#[template(path = "demo.html")]
pub struct DemoTemplate {
    pub text: String,
    pub result: Option<String>,
    pub error: Option<String>,
    pub version: String,
}

// Main page for logged-in users
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub username: String,
    pub version: String,
}

// Login template
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub flash: Option<Flash>,
    pub email: String,
    pub version: String,
}

// Signup template
#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub flash: Option<Flash>,
    pub username: String,
    pub email: String,
    pub version: String,
}
