use parley_core::records::ExpenseRow;
use serde_json::Value;
use url::Url;

use crate::config::RecordStoreConfig;
use crate::error::AppError;

/// Insert client for the record store's REST interface (PostgREST/Supabase).
pub struct RecordStore {
    http: reqwest::Client,
    insert_url: Url,
    service_key: String,
}

impl RecordStore {
    pub fn new(http: reqwest::Client, config: &RecordStoreConfig) -> Result<Self, AppError> {
        let insert_url = table_url(&config.base_url, &config.table).ok_or_else(|| {
            AppError::Internal(format!(
                "Record store URL {} cannot carry a path",
                config.base_url
            ))
        })?;

        Ok(Self {
            http,
            insert_url,
            service_key: config.service_key.clone(),
        })
    }

    /// Insert one row and return the first row the store echoes back, if any.
    pub async fn insert_expense(&self, row: &ExpenseRow) -> Result<Option<Value>, AppError> {
        let response = self
            .http
            .post(self.insert_url.clone())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(storage_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Record store rejected insert");
            return Err(AppError::Storage {
                message: format!("Supabase error: {text}"),
            });
        }

        let inserted: Value = response.json().await.map_err(storage_error)?;
        tracing::info!(
            household_id = %row.household_id,
            date = %row.date,
            "Expense stored"
        );

        Ok(match inserted {
            Value::Array(rows) => rows.into_iter().next(),
            Value::Null => None,
            other => Some(other),
        })
    }
}

fn table_url(base: &Url, table: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["rest", "v1", table]);
    Some(url)
}

fn storage_error(err: reqwest::Error) -> AppError {
    AppError::Storage {
        message: format!("Supabase error: {err}"),
    }
}
