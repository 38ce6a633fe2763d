//! GitHub repository-contents backend.
//!
//! All calls go to `<api_url>/repos/<owner>/<repo>/contents/<path>` with a bearer token and a
//! bounded per-request timeout. Status handling:
//!
//! | call   | 2xx            | 404               | 409 / 422 | other               |
//! |--------|----------------|-------------------|-----------|---------------------|
//! | get    | body           | `None`            | -         | `RemoteUnavailable` |
//! | put    | `Written`      | `ContainerMissing`| `Conflict`| `RemoteUnavailable` |
//! | delete | `Deleted`      | `NotFound`        | `Conflict`| `RemoteUnavailable` |
//!
//! The repository is the container: when it is missing it is created under the token's account
//! as a private, auto-initialised repository. A `422` from the create call means it already
//! exists, which is treated as success.

use super::{ContentsApi, DeleteOutcome, DeleteRequest, PutOutcome, PutRequest, RemoteContents};
use crate::config::GitHubSettings;
use crate::constants::STORAGE_REPO_DESCRIPTION;
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";
const CLIENT_USER_AGENT: &str = concat!("koderstore/", env!("CARGO_PKG_VERSION"));

/// Contents backend talking to the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubContents {
    client: Client,
    api_url: Url,
    owner: String,
    repo: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutResponseContent,
}

#[derive(Debug, Deserialize)]
struct PutResponseContent {
    sha: String,
}

impl GitHubContents {
    /// Builds a client for the configured repository.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigurationError` if the API URL cannot be used as a base URL or
    /// the HTTP client cannot be constructed.
    pub fn new(settings: &GitHubSettings, timeout: Duration) -> StorageResult<Self> {
        let api_url = Url::parse(settings.api_url()).map_err(|e| {
            StorageError::ConfigurationError(format!(
                "invalid GitHub API URL {}: {e}",
                settings.api_url()
            ))
        })?;
        if api_url.cannot_be_a_base() {
            return Err(StorageError::ConfigurationError(format!(
                "GitHub API URL {} cannot be used as a base URL",
                settings.api_url()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigurationError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url,
            owner: settings.owner().to_owned(),
            repo: settings.repo().to_owned(),
            token: settings.token().to_owned(),
        })
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> StorageResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StorageError::ConfigurationError("GitHub API URL cannot be a base".into())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> StorageResult<Url> {
        self.url(
            ["repos", self.owner.as_str(), self.repo.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/').filter(|s| !s.is_empty())),
        )
    }

    fn authorised(&self, request: RequestBuilder, accept: &str) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, accept)
            .header(USER_AGENT, CLIENT_USER_AGENT)
    }
}

fn unexpected(method: &str, path: &str, status: StatusCode) -> StorageError {
    StorageError::RemoteUnavailable(format!("{method} {path} returned {status}"))
}

#[async_trait]
impl ContentsApi for GitHubContents {
    async fn get(&self, path: &str) -> StorageResult<Option<RemoteContents>> {
        let url = self.contents_url(path)?;
        let response = self
            .authorised(self.client.get(url), JSON_MEDIA_TYPE)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(unexpected("GET", path, status)),
        }
    }

    async fn get_raw(&self, path: &str) -> StorageResult<Option<Vec<u8>>> {
        let url = self.contents_url(path)?;
        let response = self
            .authorised(self.client.get(url), RAW_MEDIA_TYPE)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            status => Err(unexpected("GET", path, status)),
        }
    }

    async fn put(&self, path: &str, request: &PutRequest) -> StorageResult<PutOutcome> {
        let url = self.contents_url(path)?;
        let response = self
            .authorised(self.client.put(url), JSON_MEDIA_TYPE)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(PutOutcome::ContainerMissing),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                tracing::debug!(path, status = %response.status(), "write rejected by version check");
                Ok(PutOutcome::Conflict)
            }
            status if status.is_success() => {
                // The write has been applied remotely at this point; a body we cannot read is
                // reported as a malformed response rather than a plain failure.
                let body: PutResponse = response.json().await.map_err(|e| {
                    StorageError::MalformedResponse(format!(
                        "write to {path} accepted but response unreadable: {e}"
                    ))
                })?;
                Ok(PutOutcome::Written {
                    sha: body.content.sha,
                })
            }
            status => Err(unexpected("PUT", path, status)),
        }
    }

    async fn delete(&self, path: &str, request: &DeleteRequest) -> StorageResult<DeleteOutcome> {
        let url = self.contents_url(path)?;
        let response = self
            .authorised(self.client.delete(url), JSON_MEDIA_TYPE)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => Ok(DeleteOutcome::Conflict),
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            status => Err(unexpected("DELETE", path, status)),
        }
    }

    async fn create_container(&self) -> StorageResult<()> {
        let url = self.url(["user", "repos"])?;
        let body = serde_json::json!({
            "name": self.repo,
            "description": STORAGE_REPO_DESCRIPTION,
            "private": true,
            "auto_init": true,
        });
        let response = self
            .authorised(self.client.post(url), JSON_MEDIA_TYPE)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(owner = %self.owner, repo = %self.repo, "created storage repository");
                Ok(())
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                tracing::debug!(repo = %self.repo, "storage repository already exists");
                Ok(())
            }
            status => Err(unexpected("POST", "user/repos", status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(api_url: &str) -> GitHubContents {
        let settings = GitHubSettings::new(api_url, "acme", "storage", "token").unwrap();
        GitHubContents::new(&settings, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn contents_url_encodes_segments() {
        let url = contents("https://api.github.com")
            .contents_url("users/42/my notes.txt")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/storage/contents/users/42/my%20notes.txt"
        );
    }

    #[test]
    fn contents_url_keeps_base_path() {
        let url = contents("http://127.0.0.1:9000/api/v3/")
            .contents_url("users")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/api/v3/repos/acme/storage/contents/users"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let settings = GitHubSettings::new("mailto:ops@example.com", "acme", "storage", "t").unwrap();
        assert!(matches!(
            GitHubContents::new(&settings, Duration::from_secs(1)),
            Err(StorageError::ConfigurationError(_))
        ));
    }
}
