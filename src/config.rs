use serde::Deserialize;

pub const DEFAULT_VISION_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    /// Missing key is not a startup error; every scan reports it as a config failure.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub vision: VisionConfig,
    pub free_scan_limit: i32,
    pub catalog_path: String,
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mealscan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "mealscan-users".into()),
        };
        let vision = VisionConfig {
            api_key: std::env::var("VISION_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("VISION_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into()),
            api_base: std::env::var("VISION_API_BASE")
                .unwrap_or_else(|_| DEFAULT_VISION_API_BASE.into()),
            timeout_secs: std::env::var("VISION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
        };
        Ok(Self {
            database_url,
            jwt,
            vision,
            free_scan_limit: std::env::var("FREE_SCAN_LIMIT")
                .ok()
                .and_then(|v| v.parse::<i32>().ok())
                .filter(|n| *n >= 0)
                .unwrap_or(3),
            catalog_path: std::env::var("CATALOG_PATH")
                .unwrap_or_else(|_| "data/foods.json".into()),
            minio_endpoint: std::env::var("MINIO_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            minio_bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "mealscan".into()),
            minio_access_key: std::env::var("MINIO_ACCESS_KEY")
                .unwrap_or_else(|_| "minioadmin".into()),
            minio_secret_key: std::env::var("MINIO_SECRET_KEY")
                .unwrap_or_else(|_| "minioadmin".into()),
        })
    }
}
