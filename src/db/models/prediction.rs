//! Write-only prediction history.

use serde::Serialize;
use sqlx::FromRow;
use tracing::warn;

use crate::classifier::Label;
use crate::db::DbPool;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Prediction {
    pub id: i64,
    pub user_id: i64,
    pub input_text: String,
    /// "AI" or "Human"
    pub label: String,
    /// P(AI), when the model reports probabilities
    pub probability: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPrediction<'a> {
    pub user_id: i64,
    pub input_text: &'a str,
    pub label: Label,
    pub probability: Option<f64>,
}

impl Prediction {
    /// Append one history row in its own transaction. On failure the
    /// transaction is rolled back and the error returned to the caller.
    pub async fn record(pool: &DbPool, new: &NewPrediction<'_>) -> Result<i64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO predictions (user_id, input_text, label, probability, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new.user_id)
        .bind(new.input_text)
        .bind(new.label.as_str())
        .bind(new.probability)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(result) => {
                tx.commit().await?;
                Ok(result.last_insert_rowid())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback of prediction insert failed");
                }
                Err(e)
            }
        }
    }
}
