use anyhow::{anyhow, bail, Result};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use modelmon_common::{ModelEndpointState, ModelEndpointStateList};

const SESSION_KEY_HEADER: &str = "X-V3io-Session-Key";

pub struct ApiClient {
    http: Client,
    base_url: String,
    session_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, session_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_key,
        }
    }

    /// `{base}/api/projects/{project}/model-endpoints[/extra..]`, with every
    /// caller-supplied part encoded as one path segment.
    fn endpoints_url(&self, project: &str, extra: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("api url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["api", "projects", project, "model-endpoints"])
            .extend(extra);
        Ok(url)
    }

    fn session(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.session_key {
            Some(key) => builder.header(SESSION_KEY_HEADER, key),
            None => builder,
        }
    }

    pub async fn list(
        &self,
        project: &str,
        query: &[(&str, String)],
    ) -> Result<ModelEndpointStateList> {
        let req = self.http.get(self.endpoints_url(project, &[])?).query(query);
        json_or_error(self.session(req).send().await?).await
    }

    pub async fn get(
        &self,
        project: &str,
        endpoint_id: &str,
        query: &[(&str, String)],
    ) -> Result<ModelEndpointState> {
        let url = self.endpoints_url(project, &[endpoint_id])?;
        let req = self.http.get(url).query(query);
        json_or_error(self.session(req).send().await?).await
    }

    pub async fn clear(&self, project: &str, endpoint_id: &str) -> Result<()> {
        let url = self.endpoints_url(project, &[endpoint_id, "clear"])?;
        let resp = self.session(self.http.delete(url)).send().await?;
        if resp.status().is_success() {
            return Ok(());
        }
        bail!(error_message(resp).await)
    }
}

async fn json_or_error<T: DeserializeOwned>(resp: Response) -> Result<T> {
    if resp.status().is_success() {
        return Ok(resp.json().await?);
    }
    bail!(error_message(resp).await)
}

/// `{status}: {message}` from the error envelope, or the raw body.
async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    format!("{status}: {message}")
}
