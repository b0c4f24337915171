/// Server configuration
///
/// # Environment Variables
///
/// Every setting can be overridden through the environment:
///
/// | Variable | Default | Purpose |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/storefront | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | PAY_ON_PICKUP_FEE | 0 | Surcharge for paying at collection |
/// | PAYMENT_BASE_URL | https://pay.example.com | Hosted checkout base URL |
/// | PAYMENT_SECRET | (dev default) | Shared secret for notification signatures |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/storefront HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database file
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Running environment: development | staging | production
    pub environment: String,
    /// Surcharge applied to pay-on-pickup orders
    pub pay_on_pickup_fee: f64,
    /// Hosted checkout base URL
    pub payment_base_url: String,
    /// Shared secret for payment notification signatures
    pub payment_secret: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/storefront".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            pay_on_pickup_fee: std::env::var("PAY_ON_PICKUP_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            payment_base_url: std::env::var("PAYMENT_BASE_URL")
                .unwrap_or_else(|_| "https://pay.example.com".into()),
            payment_secret: std::env::var("PAYMENT_SECRET")
                .unwrap_or_else(|_| "dev-payment-secret".into()),
        }
    }

    /// Path of the redb database file under the working directory
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("storefront.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
