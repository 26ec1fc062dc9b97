use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use configs::RemoteConfig;

use crate::credentials::Credential;
use crate::errors::ServiceError;
use crate::remote::errors::StoreError;
use crate::remote::{DocumentStore, RemoteDocument, VersionToken};

const GITHUB_JSON: &str = "application/vnd.github+json";

/// GitHub repository contents API as a document store.
///
/// Reads `GET /repos/{owner}/{repo}/contents/{path}`, writes with `PUT` on the
/// same URL. The blob SHA is the version token.
pub struct GitHubContents {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: Option<String>,
    commit_message: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

impl GitHubContents {
    pub fn new(cfg: &RemoteConfig) -> Result<Self, ServiceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(GITHUB_JSON));
        headers.insert("x-github-api-version", header::HeaderValue::from_static("2022-11-28"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            owner: cfg.owner.clone(),
            repo: cfg.repo.clone(),
            branch: cfg.branch.clone(),
            commit_message: cfg.commit_message.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    fn authorize(req: RequestBuilder, credential: Option<&Credential>) -> RequestBuilder {
        match credential {
            Some(c) => req.bearer_auth(c.bearer()),
            None => req,
        }
    }

    async fn error_body(resp: reqwest::Response) -> String {
        resp.text().await.unwrap_or_default()
    }
}

/// Decode the base64 payload; GitHub wraps it at 60 columns.
fn decode_content(raw: &str) -> Result<String, StoreError> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

fn network(e: reqwest::Error) -> StoreError {
    StoreError::Network(e.to_string())
}

#[async_trait]
impl DocumentStore for GitHubContents {
    #[instrument(skip(self, credential), fields(owner = %self.owner, repo = %self.repo, authenticated = credential.is_some()))]
    async fn read(&self, path: &str, credential: Option<&Credential>) -> Result<Option<RemoteDocument>, StoreError> {
        let mut req = self.client.get(self.url(path));
        if let Some(branch) = &self.branch {
            req = req.query(&[("ref", branch.as_str())]);
        }
        let resp = Self::authorize(req, credential).send().await.map_err(network)?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                debug!("document not found");
                return Ok(None);
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(StoreError::Unauthorized),
            s if !s.is_success() => {
                let status = s.as_u16();
                return Err(StoreError::Remote { status, message: Self::error_body(resp).await });
            }
            _ => {}
        }

        let body: ContentsResponse = resp.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        if body.encoding.as_deref().is_some_and(|enc| enc != "base64") {
            // files over 1 MB come back without inline content
            return Err(StoreError::Decode(format!(
                "unsupported content encoding {:?}",
                body.encoding.unwrap_or_default()
            )));
        }
        let content = decode_content(&body.content)?;
        Ok(Some(RemoteDocument { content, version: VersionToken::new(body.sha) }))
    }

    #[instrument(skip(self, content, credential), fields(owner = %self.owner, repo = %self.repo, bytes = content.len(), has_version = version.is_some()))]
    async fn write(
        &self,
        path: &str,
        content: &str,
        version: Option<&VersionToken>,
        credential: &Credential,
    ) -> Result<VersionToken, StoreError> {
        let body = WriteRequest {
            message: &self.commit_message,
            content: base64::engine::general_purpose::STANDARD.encode(content.as_bytes()),
            sha: version.map(VersionToken::as_str),
            branch: self.branch.as_deref(),
        };
        let resp = self
            .client
            .put(self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(credential.bearer())
            .json(&body)
            .send()
            .await
            .map_err(network)?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(StoreError::Unauthorized),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => return Err(StoreError::Conflict),
            s if !s.is_success() => {
                let status = s.as_u16();
                return Err(StoreError::Remote { status, message: Self::error_body(resp).await });
            }
            _ => {}
        }

        let written: WriteResponse = resp.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        debug!(sha = %written.content.sha, "document written");
        Ok(VersionToken::new(written.content.sha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("[{\"name\":\"A\"}]");
        let (a, b) = encoded.split_at(8);
        let wrapped = format!("{a}\n{b}\n");
        assert_eq!(decode_content(&wrapped).unwrap(), "[{\"name\":\"A\"}]");
        assert!(matches!(decode_content("@@@"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn builds_contents_url() {
        let cfg = RemoteConfig {
            api_base: "https://api.github.com/".into(),
            owner: "dumbross".into(),
            repo: "namerator-data".into(),
            ..RemoteConfig::default()
        };
        let gh = GitHubContents::new(&cfg).unwrap();
        assert_eq!(
            gh.url("/names.json"),
            "https://api.github.com/repos/dumbross/namerator-data/contents/names.json"
        );
    }

    #[test]
    fn write_request_omits_absent_sha() {
        let body = WriteRequest { message: "m", content: "W10=".into(), sha: None, branch: None };
        let v = serde_json::to_value(&body).unwrap();
        assert!(v.get("sha").is_none());
        assert!(v.get("branch").is_none());
        assert_eq!(v["content"], "W10=");
    }
}
