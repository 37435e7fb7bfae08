use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Telegram bot token
    pub token: String,
    /// Channel users must belong to before claiming, e.g. "@dealdrop"
    pub required_channel: String,
    /// Path to the sqlite database file
    pub database: String,
    /// IP address and port for the operations API
    pub bind: String,
    /// Operations API authentication token
    pub auth: String,
    /// Successful claims allowed per user per rolling 24 hours
    pub claim_quota: u64,
    /// Platform suggestions offered during submission ("Other" is implied)
    pub platforms: Vec<String>,
    /// Telegram API endpoint, overridable for tests
    pub api_url: Url,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: String::new(),
            required_channel: String::new(),
            database: "dealdrop.sqlite".to_owned(),
            bind: "127.0.0.1:8080".to_owned(),
            auth: String::new(),
            claim_quota: 2,
            platforms: vec![
                "Canva".to_owned(),
                "LinkedIn".to_owned(),
                "BigBasket".to_owned(),
                "Amazon".to_owned(),
            ],
            api_url: Url::parse("https://api.telegram.org").expect("default API URL"),
        }
    }
}

pub fn load(config: Option<&Path>) -> Result<Settings> {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));
    if let Some(path) = config {
        figment = figment.merge(Toml::file(path));
    }
    Ok(figment.merge(Env::prefixed("DEALDROP_")).extract()?)
}

#[cfg(test)]
mod test_settings {
    use super::*;

    #[test]
    fn it_should_fall_back_to_defaults() {
        let settings = load(None).unwrap();
        assert_eq!(settings.claim_quota, 2);
        assert_eq!(settings.bind, "127.0.0.1:8080");
        assert!(settings.platforms.contains(&"Canva".to_owned()));
    }
}
