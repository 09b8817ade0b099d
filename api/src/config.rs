use std::time::Duration;

use axum::http::HeaderName;
use clap::Parser;
use url::Url;

/// Agent service base URL. Older deployments of the relay pointed at
/// `https://api.letta.ai`; confirm which host your workspace lives on.
pub const DEFAULT_AGENT_BASE_URL: &str = "https://api.letta.com";
pub const DEFAULT_USER_AGENT: &str = concat!("parley-api/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_EXPENSES_TABLE: &str = "expenses";

/// Process configuration, read once at startup from flags or environment.
#[derive(Debug, Parser)]
#[command(
    name = "parley-api",
    version,
    about = "Parley relay: chat proxy with request-shape negotiation plus an expense sink for agent tools"
)]
pub struct ServerArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Bearer credential for the agent service
    #[arg(long, env = "LETTA_API_KEY", hide_env_values = true)]
    pub letta_api_key: Option<String>,

    /// Agent the relay talks to
    #[arg(long, env = "LETTA_AGENT_ID")]
    pub letta_agent_id: Option<String>,

    /// Agent service base URL
    #[arg(long, env = "LETTA_BASE_URL", default_value = DEFAULT_AGENT_BASE_URL)]
    pub letta_base_url: String,

    /// Household used when a caller does not name one
    #[arg(long, env = "DEFAULT_HOUSEHOLD_ID")]
    pub default_household_id: Option<String>,

    /// User-Agent sent to the agent service
    #[arg(long, env = "UPSTREAM_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub upstream_user_agent: String,

    /// Timeout for a single outbound request, in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Deadline for a whole shape negotiation, in seconds
    #[arg(long, env = "NEGOTIATION_TIMEOUT_SECS", default_value_t = 90)]
    pub negotiation_timeout_secs: u64,

    /// Shared secret the agent's save tool presents
    #[arg(long, env = "TOOL_SECRET", hide_env_values = true)]
    pub tool_secret: Option<String>,

    /// Read the tool secret from this header instead of `Authorization: Bearer`
    #[arg(long, env = "TOOL_SECRET_HEADER")]
    pub tool_secret_header: Option<String>,

    /// Record store (Supabase) project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Record store service-role key
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_service_key: Option<String>,

    /// Table expenses are inserted into
    #[arg(long, env = "EXPENSES_TABLE", default_value = DEFAULT_EXPENSES_TABLE)]
    pub expenses_table: String,

    /// Comma-separated list of allowed browser origins
    #[arg(long, env = "PARLEY_CORS_ORIGINS", default_value = "http://localhost:3000")]
    pub cors_origins: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid base URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("TOOL_SECRET_HEADER is not a valid header name: {0}")]
    InvalidHeaderName(String),
}

#[derive(Debug, Clone)]
pub struct AgentCredentials {
    pub api_key: String,
    pub agent_id: String,
}

/// Where the tool secret is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretScheme {
    Bearer,
    Header(HeaderName),
}

#[derive(Debug, Clone)]
pub struct ToolSecret {
    pub value: String,
    pub scheme: SecretScheme,
}

#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    pub base_url: Url,
    pub service_key: String,
    pub table: String,
}

/// Validated configuration shared by every handler through `AppState`.
///
/// Required secrets stay optional here: a relay without them still boots
/// (health, docs) and answers `500 Server not configured` per request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub agent: Option<AgentCredentials>,
    pub agent_base_url: Url,
    pub default_household_id: Option<String>,
    pub user_agent: String,
    pub upstream_timeout: Duration,
    pub negotiation_timeout: Duration,
    pub tool_secret: Option<ToolSecret>,
    pub record_store: Option<RecordStoreConfig>,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_args(args: ServerArgs) -> Result<Self, ConfigError> {
        let agent = match (present(args.letta_api_key), present(args.letta_agent_id)) {
            (Some(api_key), Some(agent_id)) => Some(AgentCredentials { api_key, agent_id }),
            _ => None,
        };

        let agent_base_url = parse_base_url("LETTA_BASE_URL", &args.letta_base_url)?;

        let scheme = match present(args.tool_secret_header) {
            Some(name) => SecretScheme::Header(
                HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                    .map_err(|_| ConfigError::InvalidHeaderName(name))?,
            ),
            None => SecretScheme::Bearer,
        };
        let tool_secret = present(args.tool_secret).map(|value| ToolSecret { value, scheme });

        let record_store = match (present(args.supabase_url), present(args.supabase_service_key)) {
            (Some(url), Some(service_key)) => Some(RecordStoreConfig {
                base_url: parse_base_url("SUPABASE_URL", &url)?,
                service_key,
                table: present(Some(args.expenses_table))
                    .unwrap_or_else(|| DEFAULT_EXPENSES_TABLE.to_string()),
            }),
            _ => None,
        };

        let cors_origins = args
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            agent,
            agent_base_url,
            default_household_id: present(args.default_household_id),
            user_agent: args.upstream_user_agent,
            upstream_timeout: Duration::from_secs(args.upstream_timeout_secs.max(1)),
            negotiation_timeout: Duration::from_secs(args.negotiation_timeout_secs.max(1)),
            tool_secret,
            record_store,
            cors_origins,
        })
    }
}

/// Blank values count as unset.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_base_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    };
    let url = Url::parse(value.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid());
    }
    Ok(url)
}

/// Configuration pointing both upstreams at a local test server.
#[cfg(test)]
pub fn test_config(upstream_base: &str) -> AppConfig {
    AppConfig {
        agent: Some(AgentCredentials {
            api_key: "test-key".to_string(),
            agent_id: "agent-1".to_string(),
        }),
        agent_base_url: Url::parse(upstream_base).expect("test base URL should parse"),
        default_household_id: None,
        user_agent: DEFAULT_USER_AGENT.to_string(),
        upstream_timeout: Duration::from_secs(5),
        negotiation_timeout: Duration::from_secs(10),
        tool_secret: Some(ToolSecret {
            value: "tool-secret".to_string(),
            scheme: SecretScheme::Bearer,
        }),
        record_store: Some(RecordStoreConfig {
            base_url: Url::parse(upstream_base).expect("test base URL should parse"),
            service_key: "service-key".to_string(),
            table: DEFAULT_EXPENSES_TABLE.to_string(),
        }),
        cors_origins: vec!["http://localhost:3000".to_string()],
    }
}
