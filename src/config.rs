use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Settings of the segmentation HTTP service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub results_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub models_dir: PathBuf,
    pub input_size: u32,
    pub max_upload_bytes: usize,
    /// Also write one colored layer file per detection.
    pub save_masks: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            results_dir: "results".into(),
            upload_dir: "/tmp".into(),
            models_dir: "models".into(),
            input_size: 640,
            max_upload_bytes: 20 * 1024 * 1024,
            save_masks: true,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let max_upload_mb: usize = parse_or(&get, "MASKBOARD_MAX_UPLOAD_MB", 20)?;
        let input_size: u32 = parse_or(&get, "MASKBOARD_INPUT_SIZE", d.input_size)?;
        if input_size == 0 {
            return Err(anyhow!("MASKBOARD_INPUT_SIZE must be positive"));
        }
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow!("MASKBOARD_MAX_UPLOAD_MB is too large: {max_upload_mb}"))?;
        Ok(Self {
            bind_addr: get("MASKBOARD_BIND").unwrap_or(d.bind_addr),
            results_dir: get("MASKBOARD_RESULTS_DIR").map_or(d.results_dir, PathBuf::from),
            upload_dir: get("MASKBOARD_UPLOAD_DIR").map_or(d.upload_dir, PathBuf::from),
            models_dir: get("MASKBOARD_MODELS_DIR").map_or(d.models_dir, PathBuf::from),
            input_size,
            max_upload_bytes,
            save_masks: parse_or(&get, "MASKBOARD_SAVE_MASKS", d.save_masks)?,
        })
    }
}

/// Settings of the Telegram front-end.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub api_url: String,
    pub download_dir: PathBuf,
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = get("TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("TOKEN is not set"))?;
        Ok(Self {
            token,
            api_url: get("MASKBOARD_API_URL")
                .unwrap_or_else(|| "http://api:8080".into())
                .trim_end_matches('/')
                .to_string(),
            download_dir: get("MASKBOARD_DOWNLOAD_DIR").map_or_else(|| "/tmp".into(), PathBuf::from),
            poll_timeout_secs: 30,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn api_defaults_apply_when_unset() {
        let cfg = ApiConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.results_dir, PathBuf::from("results"));
        assert_eq!(cfg.upload_dir, PathBuf::from("/tmp"));
        assert_eq!(cfg.input_size, 640);
        assert!(cfg.save_masks);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(ApiConfig::from_lookup(env(&[("MASKBOARD_INPUT_SIZE", "big")])).is_err());
        assert!(ApiConfig::from_lookup(env(&[("MASKBOARD_INPUT_SIZE", "0")])).is_err());
        let cfg = ApiConfig::from_lookup(env(&[("MASKBOARD_MAX_UPLOAD_MB", "5")])).unwrap();
        assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
        let huge = usize::MAX.to_string();
        assert!(ApiConfig::from_lookup(env(&[("MASKBOARD_MAX_UPLOAD_MB", huge.as_str())])).is_err());
        let cfg = ApiConfig::from_lookup(env(&[("MASKBOARD_SAVE_MASKS", "false")])).unwrap();
        assert!(!cfg.save_masks);
    }

    #[test]
    fn bot_requires_a_token() {
        assert!(BotConfig::from_lookup(env(&[])).is_err());
        let cfg =
            BotConfig::from_lookup(env(&[("TOKEN", "123:abc"), ("MASKBOARD_API_URL", "http://x:1/")]))
                .unwrap();
        assert_eq!(cfg.api_url, "http://x:1");
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp"));
    }
}
