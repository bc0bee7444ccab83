use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Datelike;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::provider::PostProvider;
use crate::store::{ViewId, ViewStore};
use crate::view::{CookieBanner, FeedView, Notification, PostCard, ViewError};

pub struct AppState {
    pub views: Arc<ViewStore>,
    pub provider: Arc<dyn PostProvider>,
    pub config: Arc<Config>,
}

// Template structs
#[derive(Template)]
#[template(path = "feed.html")]
pub struct FeedTemplate {
    /// Wrap the app in the document shell; fragments swapped by htmx leave it out
    pub full_page: bool,
    pub view_id: ViewId,
    pub site_name: String,
    pub copyright_holder: String,
    pub year: i32,
    pub theme_class: &'static str,
    pub theme_icon: &'static str,
    pub cards: Vec<PostCard>,
    pub newsletter: NewsletterPanel,
    pub cookie_visible: bool,
}

pub struct NewsletterPanel {
    pub subscribed: bool,
    pub email: String,
    pub notification: Option<Notification>,
    pub toast_duration_ms: u64,
}

#[derive(Template)]
#[template(path = "like_button.html")]
pub struct LikeButtonTemplate {
    pub view_id: ViewId,
    pub card: PostCard,
}

#[derive(Template)]
#[template(path = "newsletter.html")]
pub struct NewsletterTemplate {
    pub view_id: ViewId,
    pub newsletter: NewsletterPanel,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                error!("Failed to render template: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template: {}", err),
                )
                    .into_response()
            }
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<ViewError>().is_some() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, format!("Error: {}", self.0)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

fn newsletter_panel(
    config: &Config,
    view: &FeedView,
    notification: Option<Notification>,
) -> NewsletterPanel {
    NewsletterPanel {
        subscribed: view.subscription().is_submitted(),
        email: view.subscription().email().to_string(),
        notification,
        toast_duration_ms: config.toast_duration_ms,
    }
}

fn feed_template(config: &Config, view_id: ViewId, view: &FeedView, full_page: bool) -> FeedTemplate {
    let theme = view.theme();
    FeedTemplate {
        full_page,
        view_id,
        site_name: config.site_name.clone(),
        copyright_holder: config.copyright_holder.clone(),
        year: chrono::Utc::now().year(),
        theme_class: theme.css_class(),
        theme_icon: theme.toggle_icon(),
        cards: view.cards(),
        newsletter: newsletter_panel(config, view, None),
        cookie_visible: view.cookie_banner() == CookieBanner::Visible,
    }
}

/// Build the page router. Static assets and tracing are layered on by the caller.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/view/:view_id/refresh", post(refresh))
        .route("/view/:view_id/theme", post(toggle_theme))
        .route("/view/:view_id/posts/:post_id/like", post(toggle_like))
        .route("/view/:view_id/email", post(update_email))
        .route("/view/:view_id/subscribe", post(subscribe))
        .route("/view/:view_id/cookies/dismiss", post(dismiss_cookies))
        .with_state(state)
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let view = FeedView::new(state.provider.trending_posts(), state.config.default_theme);

    let config = &state.config;
    let (view_id, page) = state
        .views
        .mount_with(view, |view_id, view| feed_template(config, view_id, view, true))
        .await;
    info!("Mounted view {}", view_id);

    Ok(HtmlTemplate(page))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(view_id): Path<ViewId>,
) -> Result<impl IntoResponse, AppError> {
    let posts = state.provider.trending_posts();

    let config = &state.config;
    let page = state
        .views
        .update(view_id, |view| {
            view.refresh(posts);
            feed_template(config, view_id, view, false)
        })
        .await?;

    info!("Refreshed posts for view {}", view_id);
    Ok(HtmlTemplate(page))
}

pub async fn toggle_theme(
    State(state): State<Arc<AppState>>,
    Path(view_id): Path<ViewId>,
) -> Result<impl IntoResponse, AppError> {
    let config = &state.config;
    let page = state
        .views
        .update(view_id, |view| {
            let theme = view.toggle_theme();
            debug!("View {} switched to {:?} theme", view_id, theme);
            feed_template(config, view_id, view, false)
        })
        .await?;

    Ok(HtmlTemplate(page))
}

pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Path((view_id, post_id)): Path<(ViewId, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let card = state
        .views
        .update(view_id, |view| view.toggle_like(post_id))
        .await??;

    debug!("View {} set like on post {} to {}", view_id, post_id, card.liked);
    Ok(HtmlTemplate(LikeButtonTemplate { view_id, card }))
}

#[derive(Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email: String,
}

/// Keeps the typed email on the server so re-renders of the app preserve it.
pub async fn update_email(
    State(state): State<Arc<AppState>>,
    Path(view_id): Path<ViewId>,
    Form(form): Form<EmailForm>,
) -> Result<impl IntoResponse, AppError> {
    state
        .views
        .update(view_id, |view| view.set_email(&form.email))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(view_id): Path<ViewId>,
    Form(form): Form<EmailForm>,
) -> Result<impl IntoResponse, AppError> {
    // Submissions are accepted without validation
    if form.email.trim().is_empty() {
        warn!("View {} submitted the newsletter form with an empty email", view_id);
    }

    let config = &state.config;
    let newsletter = state
        .views
        .update(view_id, |view| {
            view.set_email(&form.email);
            let notification = view.submit_email(&config.site_name);
            newsletter_panel(config, view, notification)
        })
        .await?;

    if newsletter.notification.is_some() {
        info!("View {} subscribed to the newsletter", view_id);
    }

    Ok(HtmlTemplate(NewsletterTemplate {
        view_id,
        newsletter,
    }))
}

pub async fn dismiss_cookies(
    State(state): State<Arc<AppState>>,
    Path(view_id): Path<ViewId>,
) -> Result<impl IntoResponse, AppError> {
    let dismissed = state
        .views
        .update(view_id, |view| view.dismiss_cookie_banner())
        .await?;

    if dismissed {
        debug!("View {} dismissed the cookie banner", view_id);
    }

    // Empty body: htmx swaps the banner out of the page
    Ok(Html(""))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
