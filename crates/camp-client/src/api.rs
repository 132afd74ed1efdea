use reqwest::{Client, Response, StatusCode, Url};
use tracing::{debug, info, warn};

use camp_types::api::{
    ErrorBody, RegisterRequest, RegisterResponse, UserResponse, VerificationRequest,
    VerificationResponse,
};
use camp_types::models::User;

use crate::error::{FetchError, SignUpError, VerifyError, VerifyErrorKind};

/// REST client for the camping backend. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/api/users/{id}`, with the id encoded as a single path segment.
    pub fn user_url(&self, user_id: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url).map_err(|_| FetchError::InvalidUrl)?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl)?
            .pop_if_empty()
            .extend(["api", "users", user_id]);
        Ok(url)
    }

    /// GET /api/users/{id}
    pub async fn fetch_user(&self, user_id: &str) -> Result<User, FetchError> {
        let url = self.user_url(user_id)?;
        let resp = self.http.get(url).send().await?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            s => {
                warn!("User lookup for {} failed with {}", user_id, s);
                return Err(FetchError::Status(s));
            }
        }

        let body: UserResponse = resp.json().await?;
        debug!(
            "Fetched user {} with {} relationship records",
            body.user.id,
            body.user.join_camping_posts.len()
        );
        Ok(body.user)
    }

    /// POST /api/users/register. Returns the new user's id.
    pub async fn register(&self, req: &RegisterRequest) -> Result<String, SignUpError> {
        let resp = self
            .http
            .post(format!("{}/api/users/register", self.base_url))
            .json(req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SignUpError::Rejected(rejection_message(resp).await));
        }

        let body: RegisterResponse = resp.json().await.unwrap_or_default();
        let user_id = body.user_id().ok_or(SignUpError::MissingUserId)?;
        info!("Registered user {}", user_id);
        Ok(user_id.to_string())
    }

    /// POST /api/email/request-verification. Returns the verification token.
    pub async fn request_verification(&self, email: &str) -> Result<String, SignUpError> {
        let resp = self
            .http
            .post(format!("{}/api/email/request-verification", self.base_url))
            .json(&VerificationRequest {
                email: email.to_string(),
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SignUpError::Rejected(rejection_message(resp).await));
        }

        let body: VerificationResponse = resp.json().await.unwrap_or_default();
        body.token
            .filter(|t| !t.is_empty())
            .ok_or(SignUpError::MissingVerificationToken)
    }

    /// GET /api/email/verify-email?token=...
    pub async fn verify_email(&self, token: &str) -> Result<(), VerifyError> {
        let resp = self
            .http
            .get(format!("{}/api/email/verify-email", self.base_url))
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|e| VerifyError::new(VerifyErrorKind::Transport, format!("Network error: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let kind = verify_failure_kind(status);
        let message = rejection_message(resp).await;
        warn!("Email verification failed ({}): {}", status, message);
        Err(VerifyError::new(kind, message))
    }
}

/// Classify a failed verification response by status code. The backend
/// answers a bad or stale token with a 4xx; anything else is not the token's
/// fault.
fn verify_failure_kind(status: StatusCode) -> VerifyErrorKind {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::GONE => VerifyErrorKind::InvalidOrExpiredToken,
        _ => VerifyErrorKind::Rejected,
    }
}

async fn rejection_message(resp: Response) -> String {
    let status = resp.status();
    let body: ErrorBody = resp.json().await.unwrap_or_default();
    match body.text() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => format!("Request failed with status code {}", status.as_u16()),
    }
}
