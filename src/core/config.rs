use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub swagger: SwaggerConfig,
    pub security: SecurityConfig,
    pub drive: DriveConfig,
    pub crm: CrmConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
    /// `max-age` advertised on drive file listings
    pub query_cache_max_age_secs: u32,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Shared secrets guarding the inbound surfaces
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Expected value of `X-Webhook-Secret` on CRM notifications
    pub webhook_secret: String,
    /// Expected value of `X-Api-Key` on listing and display requests
    pub api_key: String,
}

/// OAuth2 credentials for an outbound REST endpoint
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub grant: OAuthGrant,
    /// Lifetime assumed when the token endpoint omits `expires_in`
    pub default_token_lifetime: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthGrant {
    ClientCredentials { scope: Option<String> },
    RefreshToken { refresh_token: String },
}

/// Google Drive target folder and credentials
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Folder under which the `<ObjectType>/<RecordId>` tree is mirrored
    pub root_folder_id: String,
    pub auth: DriveAuth,
    pub http_timeout: Duration,
}

/// How the Drive hub obtains its access tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveAuth {
    /// Service-account JSON key; the root folder must be shared with its `client_email`
    ServiceAccount { key_path: PathBuf },
    /// OAuth client plus a user's refresh token
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

/// CRM REST endpoint and credentials
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub instance_url: String,
    pub api_version: String,
    /// Record id key prefix of the user object; links to users never own uploads
    pub user_key_prefix: String,
    pub oauth: OAuthConfig,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Attempts per upload job; 1 keeps fire-and-forget semantics
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            security: SecurityConfig::from_env()?,
            drive: DriveConfig::from_env()?,
            crm: CrmConfig::from_env()?,
            upload: UploadConfig::from_env()?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String>
where
    T: ToString,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|_| format!("{} must be a valid number", key))
}

fn required_env(key: &str) -> Result<String, String> {
    env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("{} environment variable is required", key))
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1MB
    const DEFAULT_QUERY_CACHE_MAX_AGE_SECS: u32 = 30;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size =
            parse_env("MAX_REQUEST_BODY_SIZE", Self::DEFAULT_MAX_REQUEST_BODY_SIZE)?;
        let query_cache_max_age_secs = parse_env(
            "QUERY_CACHE_MAX_AGE_SECS",
            Self::DEFAULT_QUERY_CACHE_MAX_AGE_SECS,
        )?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
            query_cache_max_age_secs,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Drive Sync API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Mirrors CRM file uploads into Google Drive".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl SecurityConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            webhook_secret: required_env("WEBHOOK_SECRET")?,
            api_key: required_env("API_KEY")?,
        })
    }
}

impl DriveConfig {
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let root_folder_id = env::var("DRIVE_ROOT_FOLDER_ID").unwrap_or_else(|_| "root".to_string());

        // A service-account key takes precedence over user credentials
        let auth = match env::var("DRIVE_SERVICE_ACCOUNT_KEY")
            .ok()
            .filter(|s| !s.is_empty())
        {
            Some(key_path) => DriveAuth::ServiceAccount {
                key_path: PathBuf::from(key_path),
            },
            None => DriveAuth::AuthorizedUser {
                client_id: required_env("DRIVE_CLIENT_ID")?,
                client_secret: required_env("DRIVE_CLIENT_SECRET")?,
                refresh_token: required_env("DRIVE_REFRESH_TOKEN")?,
            },
        };

        let http_timeout_secs = parse_env("HTTP_TIMEOUT_SECS", Self::DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Self {
            root_folder_id,
            auth,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

impl CrmConfig {
    const DEFAULT_API_VERSION: &'static str = "v60.0";
    const DEFAULT_USER_KEY_PREFIX: &'static str = "005";
    const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 1800;

    pub fn from_env() -> Result<Self, String> {
        let instance_url = required_env("CRM_INSTANCE_URL")?
            .trim_end_matches('/')
            .to_string();
        let api_version =
            env::var("CRM_API_VERSION").unwrap_or_else(|_| Self::DEFAULT_API_VERSION.to_string());
        let user_key_prefix = env::var("CRM_USER_KEY_PREFIX")
            .unwrap_or_else(|_| Self::DEFAULT_USER_KEY_PREFIX.to_string());

        // Token URL defaults to the instance's OAuth endpoint
        let token_url = env::var("CRM_TOKEN_URL")
            .unwrap_or_else(|_| format!("{}/services/oauth2/token", instance_url));

        // Refresh-token grant when one is configured, client credentials otherwise
        let grant = match env::var("CRM_REFRESH_TOKEN").ok().filter(|s| !s.is_empty()) {
            Some(refresh_token) => OAuthGrant::RefreshToken { refresh_token },
            None => OAuthGrant::ClientCredentials {
                scope: env::var("CRM_SCOPE").ok().filter(|s| !s.is_empty()),
            },
        };

        let oauth = OAuthConfig {
            token_url,
            client_id: required_env("CRM_CLIENT_ID")?,
            client_secret: required_env("CRM_CLIENT_SECRET")?,
            grant,
            default_token_lifetime: Duration::from_secs(parse_env(
                "CRM_TOKEN_LIFETIME_SECS",
                Self::DEFAULT_TOKEN_LIFETIME_SECS,
            )?),
        };

        let http_timeout_secs =
            parse_env("HTTP_TIMEOUT_SECS", DriveConfig::DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Self {
            instance_url,
            api_version,
            user_key_prefix,
            oauth,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

impl UploadConfig {
    const DEFAULT_MAX_ATTEMPTS: u32 = 1;
    const DEFAULT_RETRY_DELAY_SECS: u64 = 30;

    pub fn from_env() -> Result<Self, String> {
        let max_attempts = parse_env("UPLOAD_MAX_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err("UPLOAD_MAX_ATTEMPTS must be at least 1".to_string());
        }

        let retry_delay_secs =
            parse_env("UPLOAD_RETRY_DELAY_SECS", Self::DEFAULT_RETRY_DELAY_SECS)?;

        Ok(Self {
            max_attempts,
            retry_delay: Duration::from_secs(retry_delay_secs),
        })
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(Self::DEFAULT_RETRY_DELAY_SECS),
        }
    }
}
