use std::sync::Mutex;

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::PostSettings;

/// A post card shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Position in the current feed, starting at 0
    pub id: usize,
    pub title: String,
    pub image: String,
    pub publish_date: NaiveDate,
    pub category: String,
    /// Base like count before the visitor's own like
    pub likes: u32,
}

/// Source of the posts shown on the page.
pub trait PostProvider: Send + Sync {
    fn trending_posts(&self) -> Vec<Post>;
}

/// Generates placeholder posts locally instead of calling a news API.
pub struct SyntheticPostProvider {
    settings: PostSettings,
    rng: Mutex<StdRng>,
}

impl SyntheticPostProvider {
    pub fn new(settings: PostSettings) -> Self {
        Self {
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic like counts, for tests.
    pub fn with_seed(settings: PostSettings, seed: u64) -> Self {
        Self {
            settings,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Dates run one day apart and stop at the last representable day.
    fn publish_date(&self, index: usize) -> NaiveDate {
        self.settings
            .first_publish_date
            .checked_add_days(Days::new(index as u64))
            .unwrap_or(NaiveDate::MAX)
    }

    fn random_likes(&self) -> u32 {
        if self.settings.max_likes == 0 {
            return 0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..self.settings.max_likes)
    }
}

impl PostProvider for SyntheticPostProvider {
    fn trending_posts(&self) -> Vec<Post> {
        let posts: Vec<Post> = (0..self.settings.count)
            .map(|index| Post {
                id: index,
                title: format!("Post {}", index + 1),
                image: self.settings.image_url.clone(),
                publish_date: self.publish_date(index),
                category: self.settings.category.clone(),
                likes: self.random_likes(),
            })
            .collect();

        debug!("Generated {} synthetic posts", posts.len());
        posts
    }
}
