//! Shape negotiation against the agent service's `messages` endpoint.

use std::fmt;

use axum::http::header::USER_AGENT;
use parley_core::chat::ChatTurn;
use parley_core::negotiate::{Exhausted, Step, first_success_async};
use parley_core::shapes::ShapeTemplate;
use serde_json::Value;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::config::AgentCredentials;
use crate::error::AppError;

/// Upstream bodies quoted in error messages are cut to this many characters.
const MAX_DIAGNOSTIC_CHARS: usize = 2048;

/// Why one request shape did not produce a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Non-2xx answer; the shape is assumed wrong.
    Rejected {
        shape: &'static str,
        status: u16,
        body: String,
    },
    /// Connection, timeout or body-read failure.
    Transport { shape: &'static str, cause: String },
    /// 2xx whose body is not JSON. Other request shapes cannot fix this.
    ContractViolation {
        shape: &'static str,
        status: u16,
        cause: String,
    },
}

impl AttemptFailure {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Rejected { shape, .. }
            | Self::Transport { shape, .. }
            | Self::ContractViolation { shape, .. } => shape,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected {
                shape,
                status,
                body,
            } => write!(f, "shape {shape} rejected with status {status}: {body}"),
            Self::Transport { shape, cause } => write!(f, "shape {shape} failed in transport: {cause}"),
            Self::ContractViolation {
                shape,
                status,
                cause,
            } => write!(
                f,
                "shape {shape} got status {status} with a body that is not JSON: {cause}"
            ),
        }
    }
}

/// User-visible message for a failed negotiation. Only the last attempt is
/// quoted; the full history has already been logged attempt by attempt.
pub fn describe_exhausted(exhausted: &Exhausted<AttemptFailure>) -> String {
    let Some(last) = exhausted.last() else {
        return "Upstream agent error: no request shapes to try".to_string();
    };
    match last {
        AttemptFailure::ContractViolation { .. } => {
            format!("Upstream agent error: {last}")
        }
        AttemptFailure::Rejected { status, .. } => format!(
            "Upstream agent error (status {status}) after {} attempt(s); last {last}",
            exhausted.attempts()
        ),
        AttemptFailure::Transport { .. } => format!(
            "Upstream agent unreachable after {} attempt(s); last {last}",
            exhausted.attempts()
        ),
    }
}

/// One negotiation's view of the agent service.
pub struct AgentClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    user_agent: String,
}

impl AgentClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &Url,
        credentials: &AgentCredentials,
        user_agent: &str,
    ) -> Result<Self, AppError> {
        let endpoint = agent_messages_url(base_url, &credentials.agent_id).ok_or_else(|| {
            AppError::Internal(format!("Agent base URL {base_url} cannot carry a path"))
        })?;

        Ok(Self {
            http,
            endpoint,
            api_key: credentials.api_key.clone(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Try `catalog` in order until the agent accepts a shape.
    ///
    /// Issues at most one request per shape and none after the first
    /// success. A 2xx with a non-JSON body ends the negotiation at once.
    pub async fn negotiate(
        &self,
        catalog: &[ShapeTemplate],
        turn: &ChatTurn,
    ) -> Result<Value, Exhausted<AttemptFailure>> {
        let span = tracing::info_span!(
            "negotiate",
            negotiation_id = %Uuid::now_v7(),
            endpoint = %self.endpoint,
            shapes = catalog.len(),
        );

        async move {
            let mut index = 0;
            let result = first_success_async(catalog.iter().copied(), move |shape| {
                index += 1;
                self.attempt(index, shape, turn)
            })
            .await;

            if let Err(exhausted) = &result {
                tracing::warn!(
                    attempts = exhausted.attempts(),
                    aborted = exhausted.aborted,
                    last_shape = exhausted.last().map(AttemptFailure::shape).unwrap_or("-"),
                    "Agent negotiation exhausted"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn attempt(
        &self,
        index: usize,
        shape: ShapeTemplate,
        turn: &ChatTurn,
    ) -> Step<Value, AttemptFailure> {
        let name = shape.name();
        let outcome = self.send(shape, turn).await;
        match &outcome {
            Step::Accept(_) => tracing::info!(attempt = index, shape = name, "Agent accepted shape"),
            Step::Continue(failure) | Step::Abort(failure) => {
                tracing::warn!(attempt = index, shape = name, failure = %failure, "Agent attempt failed")
            }
        }
        outcome
    }

    async fn send(&self, shape: ShapeTemplate, turn: &ChatTurn) -> Step<Value, AttemptFailure> {
        let name = shape.name();
        let response = match self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .header(USER_AGENT, &self.user_agent)
            .json(&shape.build(turn))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return Step::Continue(AttemptFailure::Transport {
                    shape: name,
                    cause: transport_cause(&err),
                });
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                return Step::Continue(AttemptFailure::Transport {
                    shape: name,
                    cause: transport_cause(&err),
                });
            }
        };

        if !status.is_success() {
            return Step::Continue(AttemptFailure::Rejected {
                shape: name,
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Step::Accept(body),
            Err(err) => Step::Abort(AttemptFailure::ContractViolation {
                shape: name,
                status: status.as_u16(),
                cause: err.to_string(),
            }),
        }
    }
}

/// `{base}/v1/agents/{agent_id}/messages`, keeping any path prefix on `base`
/// and percent-encoding the agent id.
pub fn agent_messages_url(base: &Url, agent_id: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["v1", "agents", agent_id, "messages"]);
    Some(url)
}

fn transport_cause(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DIAGNOSTIC_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
    cut.push('…');
    cut
}
