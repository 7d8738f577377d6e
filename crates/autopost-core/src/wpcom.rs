//! WordPress.com REST v1.1: password-grant token exchange, post creation, and listing.

use crate::config::WordPressSettings;
use crate::error::PlatformError;
use crate::generation::GeneratedPost;
use crate::openai::REQUEST_TIMEOUT;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::debug;

pub const UPCOMING_PAGE_SIZE: u32 = 50;

/// Bearer token returned by the OAuth2 exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// When the platform should make the post public.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTiming {
    Now,
    At(DateTime<FixedOffset>),
}

impl PublishTiming {
    pub fn status(&self) -> &'static str {
        match self {
            PublishTiming::Now => "publish",
            PublishTiming::At(_) => "future",
        }
    }
}

/// Form payload for `posts/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishRequest {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub categories: String,
    pub tags: String,
}

impl PublishRequest {
    pub fn build(post: &GeneratedPost, timing: PublishTiming) -> Self {
        let date = match timing {
            PublishTiming::Now => None,
            PublishTiming::At(at) => Some(at.to_rfc3339_opts(SecondsFormat::Secs, false)),
        };
        Self {
            title: post.title.clone(),
            content: post.html.clone(),
            excerpt: post.excerpt.clone(),
            status: timing.status().to_string(),
            date,
            categories: post.category.clone(),
            tags: post.tags.join(","),
        }
    }
}

/// Subset of a post as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "ID", default)]
    pub id: Option<u64>,
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Echo of a freshly created post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPost {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "URL", alias = "url", default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Wrapped { posts: Vec<PostSummary> },
    Bare(Vec<PostSummary>),
}

impl ListResponse {
    fn into_posts(self) -> Vec<PostSummary> {
        match self {
            ListResponse::Wrapped { posts } | ListResponse::Bare(posts) => posts,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// The blogging platform as the pipeline sees it.
pub trait BlogPlatform {
    fn authenticate(&self) -> impl Future<Output = Result<AccessToken, PlatformError>> + Send;

    fn list_upcoming(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<PostSummary>, PlatformError>> + Send;

    fn publish(
        &self,
        token: &AccessToken,
        request: &PublishRequest,
    ) -> impl Future<Output = Result<CreatedPost, PlatformError>> + Send;
}

#[derive(Debug, Clone)]
pub struct WordPressClient {
    http: reqwest::Client,
    settings: WordPressSettings,
}

impl WordPressClient {
    pub fn new(settings: &WordPressSettings) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("autopost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let mut settings = settings.clone();
        settings.api_base = settings.api_base.trim_end_matches('/').to_string();
        Ok(Self { http, settings })
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.settings.api_base)
    }

    fn posts_url(&self) -> Result<String, PlatformError> {
        let site = self.settings.site_id.trim();
        if site.is_empty() {
            return Err(PlatformError::MissingCredentials("WPCOM_SITE_ID".to_string()));
        }
        Ok(format!(
            "{}/rest/v1.1/sites/{}/posts",
            self.settings.api_base, site
        ))
    }
}

/// A 2xx token response without a usable `access_token` is still a failure.
fn parse_token(body: String) -> Result<AccessToken, PlatformError> {
    let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();
    match parsed.and_then(|t| t.access_token).filter(|t| !t.trim().is_empty()) {
        Some(token) => Ok(AccessToken::new(token)),
        None => Err(PlatformError::NoToken(body)),
    }
}

async fn reject(response: reqwest::Response) -> PlatformError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    PlatformError::Rejected { status, body }
}

impl BlogPlatform for WordPressClient {
    async fn authenticate(&self) -> Result<AccessToken, PlatformError> {
        let missing = self.settings.missing_auth_credentials();
        if !missing.is_empty() {
            return Err(PlatformError::MissingCredentials(missing.join(", ")));
        }

        let form = [
            ("client_id", self.settings.client_id.trim()),
            ("client_secret", self.settings.client_secret.trim()),
            ("grant_type", "password"),
            ("username", self.settings.username.trim()),
            ("password", self.settings.app_password.trim()),
        ];
        let response = self.http.post(self.token_url()).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        parse_token(response.text().await?)
    }

    async fn list_upcoming(&self, token: &AccessToken) -> Result<Vec<PostSummary>, PlatformError> {
        let url = self.posts_url()?;
        let page_size = UPCOMING_PAGE_SIZE.to_string();
        let response = self
            .http
            .get(&url)
            .bearer_auth(token.secret())
            .query(&[("status", "future"), ("number", page_size.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        let listing: ListResponse = response.json().await?;
        let posts = listing.into_posts();
        debug!(count = posts.len(), "Listed upcoming posts");
        Ok(posts)
    }

    async fn publish(
        &self,
        token: &AccessToken,
        request: &PublishRequest,
    ) -> Result<CreatedPost, PlatformError> {
        let url = format!("{}/new", self.posts_url()?);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token.secret())
            .form(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Denver;

    fn post() -> GeneratedPost {
        GeneratedPost {
            title: "T".to_string(),
            excerpt: "E".to_string(),
            html: "<p>H</p>".to_string(),
            category: "Fuck-It Fridays".to_string(),
            tags: vec!["Fuck It Friday".to_string(), "parenting".to_string()],
        }
    }

    #[test]
    fn test_publish_now_omits_date() {
        let request = PublishRequest::build(&post(), PublishTiming::Now);
        assert_eq!(request.status, "publish");
        assert_eq!(request.date, None);
        assert_eq!(request.content, "<p>H</p>");
        assert_eq!(request.categories, "Fuck-It Fridays");
        assert_eq!(request.tags, "Fuck It Friday,parenting");
    }

    #[test]
    fn test_future_carries_offset_timestamp() {
        let at = Denver
            .with_ymd_and_hms(2024, 3, 8, 9, 0, 0)
            .unwrap()
            .fixed_offset();
        let request = PublishRequest::build(&post(), PublishTiming::At(at));
        assert_eq!(request.status, "future");
        assert_eq!(request.date.as_deref(), Some("2024-03-08T09:00:00-07:00"));
    }

    #[test]
    fn test_list_response_accepts_wrapped_and_bare_shapes() {
        let wrapped: ListResponse = serde_json::from_str(
            r#"{"found": 1, "posts": [{"ID": 7, "date": "2024-03-08T09:00:00-07:00", "title": "x", "status": "future"}]}"#,
        )
        .unwrap();
        let posts = wrapped.into_posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, Some(7));

        let bare: ListResponse =
            serde_json::from_str(r#"[{"date": "2024-03-10T09:00:00-06:00"}]"#).unwrap();
        assert_eq!(bare.into_posts()[0].date, "2024-03-10T09:00:00-06:00");
    }

    #[test]
    fn test_created_post_reads_url_in_either_case() {
        let upper: CreatedPost =
            serde_json::from_str(r#"{"ID": 1, "title": "T", "URL": "https://x/1"}"#).unwrap();
        let lower: CreatedPost =
            serde_json::from_str(r#"{"ID": 1, "title": "T", "url": "https://x/1"}"#).unwrap();
        assert_eq!(upper.url.as_deref(), Some("https://x/1"));
        assert_eq!(lower.url, upper.url);
    }

    #[test]
    fn test_posts_url_requires_site() {
        let client = WordPressClient::new(&WordPressSettings::default()).unwrap();
        assert!(matches!(
            client.posts_url(),
            Err(PlatformError::MissingCredentials(_))
        ));

        let settings = WordPressSettings {
            site_id: "example.wordpress.com".to_string(),
            api_base: "https://public-api.wordpress.com/".to_string(),
            ..WordPressSettings::default()
        };
        let client = WordPressClient::new(&settings).unwrap();
        assert_eq!(
            client.posts_url().unwrap(),
            "https://public-api.wordpress.com/rest/v1.1/sites/example.wordpress.com/posts"
        );
        assert_eq!(client.token_url(), "https://public-api.wordpress.com/oauth2/token");
    }

    #[tokio::test]
    async fn test_authenticate_fails_fast_without_credentials() {
        let settings = WordPressSettings {
            client_id: "id".to_string(),
            ..WordPressSettings::default()
        };
        let client = WordPressClient::new(&settings).unwrap();
        match client.authenticate().await {
            Err(PlatformError::MissingCredentials(names)) => {
                assert!(names.contains("WPCOM_CLIENT_SECRET"));
                assert!(!names.contains("WPCOM_CLIENT_ID"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_token_body_without_access_token_is_rejected() {
        for body in [
            r#"{"error": "invalid_grant"}"#,
            r#"{"access_token": ""}"#,
            r#"{"access_token": null}"#,
            "not json",
        ] {
            match parse_token(body.to_string()) {
                Err(PlatformError::NoToken(carried)) => assert_eq!(carried, body),
                other => panic!("{body}: unexpected {other:?}"),
            }
        }

        let token = parse_token(r#"{"access_token": "abc", "token_type": "bearer"}"#.to_string())
            .unwrap();
        assert_eq!(token.secret(), "abc");
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("abc123");
        assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
        assert_eq!(token.secret(), "abc123");
    }
}
