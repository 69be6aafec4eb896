use unwritten_core::signing::DEFAULT_SIGNATURE_TOLERANCE_SECS;

const DEFAULT_SUPPORT_EMAIL: &str = "support@unwritten.app";

/// Server configuration loaded from environment variables.
///
/// Network settings have development defaults. Webhook secrets and the
/// admin token have none: the server refuses to start without them.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for background tasks to drain on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Shared secret for `Payment-Signature` on payment confirmations.
    pub payment_webhook_secret: String,
    /// Shared secret for `X-Rpi-Signature` on provider notifications.
    pub provider_webhook_secret: String,
    /// Bearer token for `/api/v1/admin` routes.
    pub admin_token: String,
    /// Contact address quoted in failure messages.
    pub support_email: String,
    /// Maximum age of a signed payment confirmation, in seconds.
    pub signature_tolerance_secs: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `3000`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                    |
    /// | `PAYMENT_WEBHOOK_SECRET`     | required                |
    /// | `RPI_WEBHOOK_SECRET`         | required                |
    /// | `ADMIN_TOKEN`                | required                |
    /// | `SUPPORT_EMAIL`              | `support@unwritten.app` |
    /// | `SIGNATURE_TOLERANCE_SECS`   | `300`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let signature_tolerance_secs: i64 = std::env::var("SIGNATURE_TOLERANCE_SECS")
            .map(|v| v.parse().expect("SIGNATURE_TOLERANCE_SECS must be a valid i64"))
            .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE_SECS);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            payment_webhook_secret: required_secret("PAYMENT_WEBHOOK_SECRET"),
            provider_webhook_secret: required_secret("RPI_WEBHOOK_SECRET"),
            admin_token: required_secret("ADMIN_TOKEN"),
            support_email: std::env::var("SUPPORT_EMAIL")
                .unwrap_or_else(|_| DEFAULT_SUPPORT_EMAIL.into()),
            signature_tolerance_secs,
        }
    }
}

fn required_secret(name: &str) -> String {
    let value = std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"));
    assert!(!value.trim().is_empty(), "{name} must not be empty");
    value
}
