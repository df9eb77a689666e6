//! Reddit implementation of the platform seam, over the OAuth HTTP API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::comment::Comment;
use crate::config::Credentials;
use crate::error::{BotError, Result};
use crate::listing::{Account, Listing, SubmitResponse, TokenResponse};
use crate::platform::Platform;
use crate::stream::{CommentSource, PollingStream};

/// Refresh the access token this long before it expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint does not report one
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Upper bound on any single HTTP request, body included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(16);

/// Base URLs of the Reddit API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Host serving `/api/v1/access_token`
    pub auth_url: String,
    /// Host serving authenticated API calls
    pub api_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://www.reddit.com".to_string(),
            api_url: "https://oauth.reddit.com".to_string(),
        }
    }
}

impl Endpoints {
    fn token_url(&self) -> String {
        format!("{}/api/v1/access_token", self.auth_url.trim_end_matches('/'))
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}

struct AccessToken {
    value: Secret<String>,
    expires_at: Instant,
}

impl AccessToken {
    fn is_expiring(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN >= self.expires_at
    }
}

/// Request budget Reddit reports in `x-ratelimit-*` response headers
#[derive(Debug, Default)]
struct RateLimit {
    remaining: Option<f64>,
    reset_at: Option<Instant>,
}

impl RateLimit {
    fn update(&mut self, headers: &HeaderMap, now: Instant) {
        let remaining = header_number(headers, "x-ratelimit-remaining");
        let reset = header_number(headers, "x-ratelimit-reset");
        if let (Some(remaining), Some(reset)) = (remaining, reset) {
            self.remaining = Some(remaining);
            self.reset_at = Some(now + Duration::from_secs_f64(reset));
        }
    }

    /// How long to hold the next request back, if the budget is used up
    fn delay(&self, now: Instant) -> Option<Duration> {
        match (self.remaining, self.reset_at) {
            (Some(remaining), Some(reset_at)) if remaining < 1.0 && reset_at > now => {
                Some(reset_at - now)
            }
            _ => None,
        }
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| (0.0..=f64::from(u32::MAX)).contains(n))
}

struct SessionInner {
    http: Client,
    endpoints: Endpoints,
    credentials: Credentials,
    token: Mutex<AccessToken>,
    rate_limit: Mutex<RateLimit>,
}

/// An authenticated Reddit session. Clones share the same token.
#[derive(Clone)]
pub struct RedditSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for RedditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditSession")
            .field("username", &self.inner.credentials.username)
            .field("endpoints", &self.inner.endpoints)
            .finish()
    }
}

/// Run the password grant and return an authenticated session.
///
/// Any failure, including an unreachable token endpoint, is
/// [`BotError::Authentication`]. There is no retry.
pub async fn authenticate(credentials: Credentials, endpoints: Endpoints) -> Result<RedditSession> {
    authenticate_with_timeout(credentials, endpoints, REQUEST_TIMEOUT).await
}

/// [`authenticate`] with a custom per-request timeout
pub async fn authenticate_with_timeout(
    credentials: Credentials,
    endpoints: Endpoints,
    timeout: Duration,
) -> Result<RedditSession> {
    let http = Client::builder()
        .user_agent(credentials.user_agent.as_str())
        .timeout(timeout)
        .build()
        .map_err(|e| BotError::Authentication(e.to_string()))?;

    let token = request_token(&http, &credentials, &endpoints).await?;
    info!("Authenticated as u/{}", credentials.username);

    Ok(RedditSession {
        inner: Arc::new(SessionInner {
            http,
            endpoints,
            credentials,
            token: Mutex::new(token),
            rate_limit: Mutex::new(RateLimit::default()),
        }),
    })
}

async fn request_token(
    http: &Client,
    credentials: &Credentials,
    endpoints: &Endpoints,
) -> Result<AccessToken> {
    let resp = http
        .post(endpoints.token_url())
        .basic_auth(
            &credentials.client_id,
            Some(credentials.client_secret.expose_secret()),
        )
        .form(&[
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret().as_str()),
        ])
        .send()
        .await
        .map_err(|e| BotError::Authentication(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BotError::Authentication(format!(
            "token endpoint returned {}: {}",
            status,
            body.trim()
        )));
    }

    let body: TokenResponse = resp
        .json()
        .await
        .map_err(|e| BotError::Authentication(e.to_string()))?;

    // Reddit reports bad account credentials as 200 with an error field
    if let Some(error) = body.error {
        return Err(BotError::Authentication(error));
    }
    let value = body
        .access_token
        .ok_or_else(|| BotError::Authentication("no access_token in response".to_string()))?;
    let lifetime = body
        .expires_in
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME);

    Ok(AccessToken {
        value: Secret::new(value),
        expires_at: Instant::now() + lifetime,
    })
}

impl RedditSession {
    /// Account name the session logged in with
    pub fn username(&self) -> &str {
        &self.inner.credentials.username
    }

    /// A bearer token that is valid for at least the refresh margin
    async fn bearer(&self) -> Result<String> {
        let mut token = self.inner.token.lock().await;
        if token.is_expiring() {
            debug!("Access token expiring, requesting a new one");
            *token = request_token(
                &self.inner.http,
                &self.inner.credentials,
                &self.inner.endpoints,
            )
            .await?;
        }
        Ok(token.value.expose_secret().clone())
    }

    /// Send an API request, waiting out an exhausted rate limit first
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let wait = self.inner.rate_limit.lock().await.delay(Instant::now());
        if let Some(wait) = wait {
            warn!("Rate limit used up, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        let resp = request.send().await?;
        self.inner
            .rate_limit
            .lock()
            .await
            .update(resp.headers(), Instant::now());
        Ok(resp)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let bearer = self.bearer().await?;
        let request = self
            .inner
            .http
            .get(self.inner.endpoints.api(path))
            .bearer_auth(bearer)
            .query(query);
        self.send(request).await
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Response> {
        let bearer = self.bearer().await?;
        let request = self
            .inner
            .http
            .post(self.inner.endpoints.api(path))
            .bearer_auth(bearer)
            .form(form);
        self.send(request).await
    }
}

async fn unexpected_status(resp: Response) -> String {
    let status: StatusCode = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body.trim())
    }
}

#[async_trait]
impl CommentSource for RedditSession {
    async fn newest_comments(&self, target: &str, limit: usize) -> Result<Vec<Comment>> {
        let limit = limit.to_string();
        let resp = self
            .get(
                &format!("/r/{}/comments", target),
                &[("limit", limit.as_str()), ("raw_json", "1")],
            )
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = format!(
                "listing r/{} failed with {}",
                target,
                unexpected_status(resp).await
            );
            return Err(
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    BotError::Unavailable(message)
                } else {
                    BotError::ApiResponse(message)
                },
            );
        }

        let listing: Listing = resp
            .json()
            .await
            .map_err(|e| BotError::ApiResponse(e.to_string()))?;
        Ok(listing.into_comments())
    }
}

#[async_trait]
impl Platform for RedditSession {
    type Stream = PollingStream<RedditSession>;

    async fn own_identity(&self) -> Result<String> {
        let resp = self
            .get("/api/v1/me", &[])
            .await
            .map_err(|e| BotError::SelfIdentityLookup(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BotError::SelfIdentityLookup(unexpected_status(resp).await));
        }

        let account: Account = resp
            .json()
            .await
            .map_err(|e| BotError::SelfIdentityLookup(e.to_string()))?;
        Ok(account.name)
    }

    async fn reply(&self, comment: &Comment, text: &str) -> Result<()> {
        let fullname = comment.fullname();
        let resp = self
            .post_form(
                "/api/comment",
                &[
                    ("api_type", "json"),
                    ("thing_id", fullname.as_str()),
                    ("text", text),
                ],
            )
            .await?;

        if !resp.status().is_success() {
            return Err(BotError::ReplyRejected {
                comment_id: comment.id.clone(),
                reason: unexpected_status(resp).await,
            });
        }

        let submitted: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| BotError::ApiResponse(e.to_string()))?;
        match submitted.error_message() {
            Some(reason) => Err(BotError::ReplyRejected {
                comment_id: comment.id.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    fn comments(&self, target: &str, skip_existing: bool) -> Self::Stream {
        PollingStream::new(self.clone(), target, skip_existing)
    }
}
