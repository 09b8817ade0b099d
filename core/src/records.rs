use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use utoipa::ToSchema;

pub const DEFAULT_CURRENCY: &str = "INR";
pub const DEFAULT_CATEGORY: &str = "Miscellaneous";
/// Household used when neither the caller nor the server names one.
pub const FALLBACK_HOUSEHOLD_ID: &str = "home-001";
/// Every row written through the relay is tagged as coming from text chat.
pub const RECORD_SOURCE: &str = "text";

const ISO_DATE: &str = "%Y-%m-%d";
const DAY_FIRST_DATE: &str = "%d-%m-%Y";

/// Expense as sent by the agent's save tool. Only used for API docs; the
/// handler validates the raw JSON so loosely-typed tool output is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveExpenseRequest {
    /// `YYYY-MM-DD` or `DD-MM-YYYY`
    pub date: String,
    /// Number or numeric string
    pub amount: Value,
    pub user_email: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub household_id: Option<String>,
}

/// Row inserted into the `expenses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpenseRow {
    pub household_id: String,
    pub user_email: String,
    /// Always ISO `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub description: Option<String>,
    pub source: String,
}

/// Response of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaveExpenseResponse {
    pub ok: bool,
    /// First row returned by the store, if it returned any
    pub row: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordValidationError {
    #[error("Body must be JSON")]
    MalformedBody,
    #[error("Missing fields: date, amount, user_email")]
    MissingFields,
    #[error("amount must be a number")]
    InvalidAmount,
    #[error("date must be YYYY-MM-DD or DD-MM-YYYY")]
    InvalidDate,
}

/// Validate a save-expense body and build the row to store.
pub fn parse_expense(
    body: &[u8],
    default_household_id: Option<&str>,
) -> Result<ExpenseRow, RecordValidationError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| RecordValidationError::MalformedBody)?;
    let empty = Map::new();
    let fields = value.as_object().unwrap_or(&empty);

    let date = text(fields, "date");
    let user_email = text(fields, "user_email");
    let amount = parse_amount(fields.get("amount"))?;
    let (Some(date), Some(amount), Some(user_email)) = (date, amount, user_email) else {
        return Err(RecordValidationError::MissingFields);
    };

    let household_id = text(fields, "household_id")
        .or(default_household_id)
        .unwrap_or(FALLBACK_HOUSEHOLD_ID);

    Ok(ExpenseRow {
        household_id: household_id.to_string(),
        user_email: user_email.to_string(),
        date: normalize_date(date)?,
        amount,
        currency: text(fields, "currency")
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string(),
        category: text(fields, "category")
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string(),
        description: fields
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        source: RECORD_SOURCE.to_string(),
    })
}

/// Rewrite a `DD-MM-YYYY` date to ISO; ISO dates are re-emitted zero-padded.
pub fn normalize_date(raw: &str) -> Result<String, RecordValidationError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, ISO_DATE)
        .or_else(|_| NaiveDate::parse_from_str(raw, DAY_FIRST_DATE))
        .map(|date| date.format(ISO_DATE).to_string())
        .map_err(|_| RecordValidationError::InvalidDate)
}

/// `Ok(None)` means "missing" (absent, null, blank or zero).
fn parse_amount(value: Option<&Value>) -> Result<Option<f64>, RecordValidationError> {
    let amount = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(None),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match amount {
        Some(amount) if !amount.is_finite() => Err(RecordValidationError::InvalidAmount),
        Some(amount) if amount == 0.0 => Ok(None),
        Some(amount) => Ok(Some(amount)),
        None => Err(RecordValidationError::InvalidAmount),
    }
}

fn text<'a>(fields: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    fields
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
