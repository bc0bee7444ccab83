use anyhow::bail;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::view::Theme;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_copyright_holder")]
    pub copyright_holder: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub default_theme: Theme,
    /// How long the subscription toast stays on screen, in milliseconds
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    #[serde(default)]
    pub posts: PostSettings,
    #[serde(default)]
    pub views: ViewSettings,
}

fn default_site_name() -> String {
    "SheldonNews".to_string()
}

fn default_copyright_holder() -> String {
    "Spectactulr News".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_toast_duration_ms() -> u64 {
    5000
}

/// Shape of the synthetic trending posts.
#[derive(Debug, Deserialize, Clone)]
pub struct PostSettings {
    #[serde(default = "default_post_count")]
    pub count: usize,
    #[serde(default = "default_image_url")]
    pub image_url: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_first_publish_date")]
    pub first_publish_date: NaiveDate,
    /// Exclusive upper bound for the random base like count
    #[serde(default = "default_max_likes")]
    pub max_likes: u32,
}

fn default_post_count() -> usize {
    9
}

fn default_image_url() -> String {
    "https://images.unsplash.com/photo-1587837073080-448bc6a2329b?crop=entropy&cs=tinysrgb&fit=max&fm=jpg&q=80&w=1080".to_string()
}

fn default_category() -> String {
    "Technology".to_string()
}

fn default_first_publish_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

fn default_max_likes() -> u32 {
    100
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            count: default_post_count(),
            image_url: default_image_url(),
            category: default_category(),
            first_publish_date: default_first_publish_date(),
            max_likes: default_max_likes(),
        }
    }
}

/// Lifetime and capacity of the server-side view registry.
#[derive(Debug, Deserialize, Clone)]
pub struct ViewSettings {
    /// Idle time after which a mounted view is dropped, in minutes
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
    #[serde(default = "default_max_views")]
    pub max_views: usize,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_ttl_minutes() -> u64 {
    60
}

fn default_max_views() -> usize {
    10_000
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            max_views: default_max_views(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl ViewSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.views.ttl_minutes == 0 {
            bail!("views.ttl_minutes must be at least 1");
        }
        if self.views.max_views == 0 {
            bail!("views.max_views must be at least 1");
        }
        // Every generated post needs a representable publish date
        let last_offset = self.posts.count.saturating_sub(1) as u64;
        if self
            .posts
            .first_publish_date
            .checked_add_days(Days::new(last_offset))
            .is_none()
        {
            bail!(
                "posts.first_publish_date {} leaves no room for {} posts",
                self.posts.first_publish_date,
                self.posts.count
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            copyright_holder: default_copyright_holder(),
            bind_address: default_bind_address(),
            default_theme: Theme::default(),
            toast_duration_ms: default_toast_duration_ms(),
            posts: PostSettings::default(),
            views: ViewSettings::default(),
        }
    }
}
