//! Per-mount page state and its update functions.
//!
//! Every interaction on the page maps to one method on [`FeedView`]. Rendering
//! reads the state through [`FeedView::cards`] and the accessors and never
//! mutates it.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::provider::Post;
use crate::store::ViewId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Theme::Light => "theme-light",
            Theme::Dark => "theme-dark",
        }
    }

    /// Icon of the toggle button: a sun to go light, a moon to go dark.
    pub fn toggle_icon(self) -> &'static str {
        match self {
            Theme::Light => "🌙",
            Theme::Dark => "☀️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieBanner {
    Visible,
    Hidden,
}

impl CookieBanner {
    /// Returns true if the banner was visible before the call.
    pub fn dismiss(&mut self) -> bool {
        let was_visible = *self == CookieBanner::Visible;
        *self = CookieBanner::Hidden;
        was_visible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Idle,
    Submitted,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    email: String,
    status: SubscriptionStatus,
}

impl Subscription {
    fn new() -> Self {
        Self {
            email: String::new(),
            status: SubscriptionStatus::Idle,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn is_submitted(&self) -> bool {
        self.status == SubscriptionStatus::Submitted
    }
}

/// Liked flags keyed by post id. A missing key means not liked.
#[derive(Debug, Clone, Default)]
pub struct LikeState {
    flags: HashMap<usize, bool>,
}

impl LikeState {
    pub fn toggle(&mut self, post_id: usize) -> bool {
        let flag = self.flags.entry(post_id).or_insert(false);
        *flag = !*flag;
        *flag
    }

    pub fn is_liked(&self, post_id: usize) -> bool {
        self.flags.get(&post_id).copied().unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    fn clear(&mut self) {
        self.flags.clear();
    }
}

/// Toast shown after the newsletter signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

/// Render model of a single post card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: usize,
    pub title: String,
    pub image: String,
    pub publish_date: String,
    pub category: String,
    pub likes: u32,
    pub liked: bool,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view {0} not found or expired")]
    UnknownView(ViewId),
    #[error("post {0} is not part of the current feed")]
    UnknownPost(usize),
}

#[derive(Debug, Clone)]
pub struct FeedView {
    posts: Vec<Post>,
    likes: LikeState,
    theme: Theme,
    cookie_banner: CookieBanner,
    subscription: Subscription,
}

impl FeedView {
    /// Mount a view with its initial posts.
    pub fn new(posts: Vec<Post>, theme: Theme) -> Self {
        Self {
            posts,
            likes: LikeState::default(),
            theme,
            cookie_banner: CookieBanner::Visible,
            subscription: Subscription::new(),
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn likes(&self) -> &LikeState {
        &self.likes
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn cookie_banner(&self) -> CookieBanner {
        self.cookie_banner
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Replace the feed. Like flags belong to the old posts and are dropped.
    pub fn refresh(&mut self, posts: Vec<Post>) {
        debug!("Replacing {} posts with {}", self.posts.len(), posts.len());
        self.posts = posts;
        self.likes.clear();
    }

    pub fn toggle_like(&mut self, post_id: usize) -> Result<PostCard, ViewError> {
        let post = self
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .ok_or(ViewError::UnknownPost(post_id))?;
        self.likes.toggle(post_id);
        Ok(self.card_for(post))
    }

    pub fn displayed_likes(&self, post_id: usize) -> Option<u32> {
        self.posts
            .iter()
            .find(|p| p.id == post_id)
            .map(|p| self.count_for(p))
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn dismiss_cookie_banner(&mut self) -> bool {
        self.cookie_banner.dismiss()
    }

    /// Track the email field. Ignored once the subscription went through.
    pub fn set_email(&mut self, email: &str) {
        if self.subscription.is_submitted() {
            return;
        }
        self.subscription.email = email.to_string();
    }

    /// Mark the subscription as submitted, whatever the email field holds.
    ///
    /// Only the idle to submitted transition produces a notification.
    pub fn submit_email(&mut self, site_name: &str) -> Option<Notification> {
        if self.subscription.is_submitted() {
            return None;
        }
        self.subscription.status = SubscriptionStatus::Submitted;
        Some(Notification {
            title: "Success!".to_string(),
            description: format!("You've been subscribed to {}.", site_name),
        })
    }

    pub fn cards(&self) -> Vec<PostCard> {
        self.posts.iter().map(|p| self.card_for(p)).collect()
    }

    fn count_for(&self, post: &Post) -> u32 {
        if self.likes.is_liked(post.id) {
            post.likes + 1
        } else {
            post.likes
        }
    }

    fn card_for(&self, post: &Post) -> PostCard {
        PostCard {
            id: post.id,
            title: post.title.clone(),
            image: post.image.clone(),
            publish_date: post.publish_date.format("%Y-%m-%d").to_string(),
            category: post.category.clone(),
            likes: self.count_for(post),
            liked: self.likes.is_liked(post.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostSettings;
    use crate::provider::{PostProvider, SyntheticPostProvider};

    fn create_view(seed: u64) -> FeedView {
        let provider = SyntheticPostProvider::with_seed(PostSettings::default(), seed);
        FeedView::new(provider.trending_posts(), Theme::Light)
    }

    mod mount_tests {
        use super::*;

        #[test]
        fn test_initial_state() {
            let view = create_view(1);

            assert_eq!(view.posts().len(), 9);
            assert!(view.likes().is_empty());
            assert_eq!(view.theme(), Theme::Light);
            assert_eq!(view.cookie_banner(), CookieBanner::Visible);
            assert_eq!(view.subscription().status(), SubscriptionStatus::Idle);
            assert_eq!(view.subscription().email(), "");
        }

        #[test]
        fn test_cards_mirror_posts() {
            let view = create_view(1);
            let cards = view.cards();

            assert_eq!(cards.len(), 9);
            assert_eq!(cards[0].title, "Post 1");
            assert_eq!(cards[0].publish_date, "2023-01-01");
            assert_eq!(cards[0].likes, view.posts()[0].likes);
            assert!(cards.iter().all(|c| !c.liked));
        }
    }

    mod like_tests {
        use super::*;

        #[test]
        fn test_like_adds_one() {
            let mut view = create_view(2);
            let base = view.posts()[3].likes;

            let card = view.toggle_like(3).unwrap();

            assert!(card.liked);
            assert_eq!(card.likes, base + 1);
            assert_eq!(view.displayed_likes(3), Some(base + 1));
        }

        #[test]
        fn test_double_toggle_restores_base() {
            let mut view = create_view(2);
            let base = view.posts()[0].likes;

            view.toggle_like(0).unwrap();
            let card = view.toggle_like(0).unwrap();

            assert!(!card.liked);
            assert_eq!(card.likes, base);
        }

        #[test]
        fn test_likes_are_independent() {
            let mut view = create_view(2);
            let base_one = view.posts()[1].likes;

            view.toggle_like(0).unwrap();

            assert_eq!(view.displayed_likes(1), Some(base_one));
            assert!(view.likes().is_liked(0));
            assert!(!view.likes().is_liked(1));
        }

        #[test]
        fn test_unknown_post_is_rejected() {
            let mut view = create_view(2);

            let result = view.toggle_like(9);

            assert!(matches!(result, Err(ViewError::UnknownPost(9))));
            assert!(view.likes().is_empty());
        }

        #[test]
        fn test_displayed_likes_for_unknown_post() {
            let view = create_view(2);
            assert_eq!(view.displayed_likes(42), None);
        }
    }

    mod refresh_tests {
        use super::*;

        #[test]
        fn test_refresh_resets_likes() {
            let mut view = create_view(3);
            view.toggle_like(0).unwrap();

            let fresh = SyntheticPostProvider::with_seed(PostSettings::default(), 99)
                .trending_posts();
            let new_base = fresh[0].likes;
            view.refresh(fresh);

            assert!(view.likes().is_empty());
            assert_eq!(view.displayed_likes(0), Some(new_base));
        }

        #[test]
        fn test_refresh_restarts_ids() {
            let mut view = create_view(3);
            let fresh = SyntheticPostProvider::with_seed(PostSettings::default(), 4)
                .trending_posts();

            view.refresh(fresh);

            let ids: Vec<usize> = view.posts().iter().map(|p| p.id).collect();
            assert_eq!(ids, (0..9).collect::<Vec<_>>());
        }

        #[test]
        fn test_refresh_keeps_other_state() {
            let mut view = create_view(3);
            view.toggle_theme();
            view.dismiss_cookie_banner();

            view.refresh(Vec::new());

            assert_eq!(view.theme(), Theme::Dark);
            assert_eq!(view.cookie_banner(), CookieBanner::Hidden);
            assert!(view.cards().is_empty());
        }
    }

    mod theme_tests {
        use super::*;

        #[test]
        fn test_toggle_twice_restores_theme() {
            let mut view = create_view(1);

            assert_eq!(view.toggle_theme(), Theme::Dark);
            assert_eq!(view.toggle_theme(), Theme::Light);
        }

        #[test]
        fn test_theme_presentation() {
            assert_eq!(Theme::Light.css_class(), "theme-light");
            assert_eq!(Theme::Dark.css_class(), "theme-dark");
            assert_ne!(Theme::Light.toggle_icon(), Theme::Dark.toggle_icon());
        }
    }

    mod cookie_banner_tests {
        use super::*;

        #[test]
        fn test_dismiss_is_one_way() {
            let mut view = create_view(1);

            assert!(view.dismiss_cookie_banner());
            assert_eq!(view.cookie_banner(), CookieBanner::Hidden);

            // A second dismissal changes nothing
            assert!(!view.dismiss_cookie_banner());
            assert_eq!(view.cookie_banner(), CookieBanner::Hidden);
        }
    }

    mod subscription_tests {
        use super::*;

        #[test]
        fn test_submit_emits_notification() {
            let mut view = create_view(1);
            view.set_email("reader@example.com");

            let note = view.submit_email("SheldonNews").unwrap();

            assert_eq!(note.title, "Success!");
            assert_eq!(note.description, "You've been subscribed to SheldonNews.");
            assert!(view.subscription().is_submitted());
            assert_eq!(view.subscription().email(), "reader@example.com");
        }

        #[test]
        fn test_empty_email_still_submits() {
            let mut view = create_view(1);

            let note = view.submit_email("SheldonNews");

            assert!(note.is_some());
            assert!(view.subscription().is_submitted());
        }

        #[test]
        fn test_second_submit_is_silent() {
            let mut view = create_view(1);
            view.submit_email("SheldonNews");

            assert!(view.submit_email("SheldonNews").is_none());
            assert!(view.subscription().is_submitted());
        }

        #[test]
        fn test_email_frozen_after_submit() {
            let mut view = create_view(1);
            view.set_email("first@example.com");
            view.submit_email("SheldonNews");

            view.set_email("second@example.com");

            assert_eq!(view.subscription().email(), "first@example.com");
        }
    }
}
