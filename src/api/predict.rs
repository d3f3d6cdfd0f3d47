use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::auth::CurrentUser;
use crate::api::error::ApiError;
use crate::api::metrics;
use crate::api::validation::prediction_text;
use crate::classifier::Label;
use crate::db::{NewPrediction, Prediction};
use crate::AppState;

/// Request body for the JSON prediction API
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    /// Probability that the text is AI-generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Label shown by the accounts UI and returned by the API
pub fn display_label(label: Label) -> &'static str {
    match label {
        Label::Ai => "🤖 AI Generated",
        Label::Human => "🧑 Human Written",
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Classify text for the logged-in user and append it to their history
///
/// POST /predict
pub async fn predict(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        debug!(error = %e, "Rejected prediction body");
        ApiError::bad_request("Request body must be JSON with a \"text\" field")
    })?;

    let text = req
        .text
        .as_deref()
        .and_then(prediction_text)
        .ok_or_else(|| ApiError::validation("Please enter some text."))?;

    let detector = state.detector()?;
    let verdict = detector.predict(text);
    metrics::record_prediction(verdict.label);

    let response = PredictResponse {
        prediction: display_label(verdict.label).to_string(),
        probability: verdict.ai_probability.map(round4),
    };

    // History is best effort: a failed write never fails the prediction
    let db = state.db()?;
    let new = NewPrediction {
        user_id: user.id,
        input_text: text,
        label: verdict.label,
        probability: verdict.ai_probability,
    };
    if let Err(e) = Prediction::record(db, &new).await {
        warn!(user_id = user.id, error = %e, "Failed to record prediction history");
        metrics::record_history_failure();
    }

    Ok(Json(response))
}
