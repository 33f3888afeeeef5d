use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::domain::repository::OAuthProviderPort;
use crate::domain::types::OAuthProfile;
use crate::error::AuthServiceError;

pub const GOOGLE: &str = "google";
pub const GITHUB: &str = "github";

const CLIENT_USER_AGENT: &str = "shopdesk-auth";

#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderCredentials {
    /// Both halves must be present and non-empty.
    pub fn from_parts(id: Option<String>, secret: Option<String>) -> Option<Self> {
        match (id, secret) {
            (Some(client_id), Some(client_secret))
                if !client_id.is_empty() && !client_secret.is_empty() =>
            {
                Some(Self {
                    client_id,
                    client_secret,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Endpoints {
    token_url: &'static str,
    userinfo_url: &'static str,
    emails_url: Option<&'static str>,
}

const GOOGLE_ENDPOINTS: Endpoints = Endpoints {
    token_url: "https://oauth2.googleapis.com/token",
    userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo",
    emails_url: None,
};

const GITHUB_ENDPOINTS: Endpoints = Endpoints {
    token_url: "https://github.com/login/oauth/access_token",
    userinfo_url: "https://api.github.com/user",
    emails_url: Some("https://api.github.com/user/emails"),
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// An address Google reports as unverified is dropped, which leaves the
/// profile incomplete.
fn google_profile(info: GoogleUserInfo) -> OAuthProfile {
    let email = match info.email_verified {
        Some(false) => None,
        _ => info.email,
    };
    OAuthProfile {
        provider: GOOGLE.to_owned(),
        provider_id: info.sub,
        email: email.unwrap_or_default(),
        first_name: info.given_name,
        last_name: info.family_name,
        avatar_url: info.picture,
    }
}

/// GitHub has a single display name; split it at the first space.
fn github_profile(user: GithubUser, email: Option<String>) -> OAuthProfile {
    let (first_name, last_name) = match user.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => match name.split_once(' ') {
            Some((first, last)) => (Some(first.to_owned()), Some(last.trim().to_owned())),
            None => (Some(name.to_owned()), None),
        },
        _ => (Some(user.login.clone()), None),
    };
    OAuthProfile {
        provider: GITHUB.to_owned(),
        provider_id: user.id.to_string(),
        email: email.or(user.email).unwrap_or_default(),
        first_name,
        last_name,
        avatar_url: user.avatar_url,
    }
}

fn primary_verified_email(emails: Vec<GithubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

/// Authorization-code exchange against Google and GitHub.
#[derive(Clone)]
pub struct HttpOAuthClient {
    http: reqwest::Client,
    google: Option<ProviderCredentials>,
    github: Option<ProviderCredentials>,
}

impl HttpOAuthClient {
    pub fn new(google: Option<ProviderCredentials>, github: Option<ProviderCredentials>) -> Self {
        Self {
            http: reqwest::Client::new(),
            google,
            github,
        }
    }

    fn provider(&self, name: &str) -> Option<(&ProviderCredentials, Endpoints)> {
        match name {
            GOOGLE => self.google.as_ref().map(|c| (c, GOOGLE_ENDPOINTS)),
            GITHUB => self.github.as_ref().map(|c| (c, GITHUB_ENDPOINTS)),
            _ => None,
        }
    }

    async fn exchange_code(
        &self,
        creds: &ProviderCredentials,
        endpoints: Endpoints,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, AuthServiceError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];
        let response = self
            .http
            .post(endpoints.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .context("oauth token request")?;
        if !response.status().is_success() {
            tracing::info!(status = %response.status(), "oauth code exchange rejected");
            return Err(AuthServiceError::InvalidCredentials);
        }
        // GitHub answers 200 with an error body for bad codes; no access_token then.
        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::info!(error = %e, "oauth token response without access token");
            AuthServiceError::InvalidCredentials
        })?;
        Ok(token.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AuthServiceError> {
        let value = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json::<T>()
            .await
            .with_context(|| format!("decode {url}"))?;
        Ok(value)
    }
}

impl OAuthProviderPort for HttpOAuthClient {
    async fn fetch_profile(
        &self,
        provider: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthProfile, AuthServiceError> {
        let (creds, endpoints) = self
            .provider(provider)
            .ok_or(AuthServiceError::UnsupportedProvider)?;
        if code.is_empty() {
            return Err(AuthServiceError::Validation("authorization code is required".to_owned()));
        }
        let access_token = self
            .exchange_code(creds, endpoints, code, redirect_uri)
            .await?;

        let profile = match provider {
            GOOGLE => {
                let info: GoogleUserInfo =
                    self.get_json(endpoints.userinfo_url, &access_token).await?;
                google_profile(info)
            }
            _ => {
                let user: GithubUser = self.get_json(endpoints.userinfo_url, &access_token).await?;
                let email = match (&user.email, endpoints.emails_url) {
                    (None, Some(url)) => {
                        let emails: Vec<GithubEmail> = self.get_json(url, &access_token).await?;
                        primary_verified_email(emails)
                    }
                    _ => None,
                };
                github_profile(user, email)
            }
        };

        if profile.email.is_empty() {
            return Err(AuthServiceError::OAuthProfileIncomplete);
        }
        Ok(profile)
    }
}
