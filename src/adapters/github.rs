//! GitHub REST and GraphQL client.
//!
//! Thin wrapper over `reqwest` that authenticates every request, walks
//! paginated listings and turns non-2xx answers into [`Error::Http`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::GitHubApi;
use crate::domain::{Artifact, DispatchAck, Repository, Workflow, WorkflowId, WorkflowRun};
use crate::error::{Error, Result};

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;
const USER_AGENT: &str = concat!("wfdispatch/", env!("CARGO_PKG_VERSION"));

const OPEN_PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: OPEN, first: 100, after: $cursor) {
      nodes { headRefName }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

/// GitHub API client
pub struct GitHubClient {
    /// Token sent as a bearer credential
    token: String,
    /// REST base URL without trailing slash
    api_url: String,
    /// GraphQL endpoint derived from `api_url`
    graphql_url: String,
    /// HTTP client
    client: reqwest::Client,
}

/// One page of a paginated REST listing
trait Page: DeserializeOwned {
    type Item;

    fn total_count(&self) -> Option<usize>;
    fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Debug, Deserialize)]
struct WorkflowsPage {
    total_count: usize,
    workflows: Vec<Workflow>,
}

impl Page for WorkflowsPage {
    type Item = Workflow;

    fn total_count(&self) -> Option<usize> {
        Some(self.total_count)
    }

    fn into_items(self) -> Vec<Workflow> {
        self.workflows
    }
}

#[derive(Debug, Deserialize)]
struct RunsPage {
    total_count: usize,
    workflow_runs: Vec<WorkflowRun>,
}

impl Page for RunsPage {
    type Item = WorkflowRun;

    fn total_count(&self) -> Option<usize> {
        Some(self.total_count)
    }

    fn into_items(self) -> Vec<WorkflowRun> {
        self.workflow_runs
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactsPage {
    artifacts: Vec<Artifact>,
}

/// Error body GitHub sends with 4xx/5xx answers
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestsData {
    repository: Option<PullRequestsRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestsRepository {
    pull_requests: PullRequestConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestConnection {
    nodes: Vec<PullRequestNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    head_ref_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

/// GraphQL endpoint for a REST base URL.
///
/// GitHub Enterprise Server serves REST under `/api/v3` and GraphQL under
/// `/api/graphql`; api.github.com serves GraphQL at `/graphql`.
fn graphql_endpoint(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    match base.strip_suffix("/api/v3") {
        Some(host) => format!("{}/api/graphql", host),
        None => format!("{}/graphql", base),
    }
}

/// Whether another page has to be fetched after one returned `page_len` items
fn has_more(page_len: usize, collected: usize, total_count: Option<usize>) -> bool {
    if page_len < PER_PAGE {
        return false;
    }
    match total_count {
        Some(total) => collected < total,
        None => true,
    }
}

impl GitHubClient {
    /// Create a client for api.github.com
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_options(token, DEFAULT_API_URL, Duration::from_secs(30))
    }

    /// Create a client for a custom endpoint (GitHub Enterprise Server)
    pub fn with_options(
        token: impl Into<String>,
        api_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;

        let api_url = api_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            token: token.into(),
            graphql_url: graphql_endpoint(&api_url),
            api_url,
            client,
        })
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    fn repo_url(&self, repo: &Repository, path: &str) -> String {
        self.api_url(&format!("repos/{}/{}/{}", repo.owner, repo.name, path))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Map a non-2xx response to [`Error::Http`]
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        Err(Error::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.request(Method::GET, url).query(query).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch every page of a listing
    async fn get_all_pages<P: Page>(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut page_number = 1usize;

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("per_page", PER_PAGE.to_string()));
            page_query.push(("page", page_number.to_string()));

            let page: P = self.get_json(url, &page_query).await?;
            let total = page.total_count();
            let page_items = page.into_items();
            let page_len = page_items.len();
            items.extend(page_items);

            debug!(url, page = page_number, page_len, collected = items.len(), "Fetched page");

            if !has_more(page_len, items.len(), total) {
                return Ok(items);
            }
            page_number += 1;
        }
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> Result<T> {
        let response = self
            .request(Method::POST, &self.graphql_url)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let response = Self::check(response).await?;

        let result: GraphQlResponse<T> = response.json().await?;
        if !result.errors.is_empty() {
            let messages: Vec<String> = result.errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GraphQl(messages.join("; ")));
        }

        result
            .data
            .ok_or_else(|| Error::GraphQl("response contained no data".to_string()))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn create_dispatch(
        &self,
        repo: &Repository,
        workflow: &WorkflowId,
        git_ref: &str,
        inputs: &HashMap<String, String>,
    ) -> Result<DispatchAck> {
        let url = self.repo_url(repo, &format!("actions/workflows/{}/dispatches", workflow));

        let response = self
            .request(Method::POST, &url)
            .json(&serde_json::json!({
                "ref": git_ref,
                "inputs": inputs,
            }))
            .send()
            .await?;
        let response = Self::check(response).await?;

        Ok(DispatchAck {
            status: response.status().as_u16(),
        })
    }

    async fn list_workflows(&self, repo: &Repository) -> Result<Vec<Workflow>> {
        let url = self.repo_url(repo, "actions/workflows");
        self.get_all_pages::<WorkflowsPage>(&url, &[]).await
    }

    async fn list_workflow_runs(
        &self,
        repo: &Repository,
        workflow: &WorkflowId,
        event: &str,
    ) -> Result<Vec<WorkflowRun>> {
        let url = self.repo_url(repo, &format!("actions/workflows/{}/runs", workflow));
        self.get_all_pages::<RunsPage>(&url, &[("event", event.to_string())])
            .await
    }

    async fn get_workflow_run(&self, repo: &Repository, run_id: u64) -> Result<WorkflowRun> {
        let url = self.repo_url(repo, &format!("actions/runs/{}", run_id));
        self.get_json(&url, &[]).await
    }

    async fn list_run_artifacts(&self, repo: &Repository, run_id: u64) -> Result<Vec<Artifact>> {
        let url = self.repo_url(repo, &format!("actions/runs/{}/artifacts", run_id));
        let page: ArtifactsPage = self.get_json(&url, &[]).await?;
        Ok(page.artifacts)
    }

    async fn open_pull_request_branches(&self, repo: &Repository) -> Result<Vec<String>> {
        let mut branches = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let data: PullRequestsData = self
                .graphql(
                    OPEN_PULL_REQUESTS_QUERY,
                    serde_json::json!({
                        "owner": repo.owner,
                        "name": repo.name,
                        "cursor": cursor,
                    }),
                )
                .await?;

            let connection = data
                .repository
                .ok_or_else(|| Error::GraphQl(format!("repository {} not found", repo)))?
                .pull_requests;

            branches.extend(connection.nodes.into_iter().map(|n| n.head_ref_name));

            match connection.page_info.end_cursor {
                Some(next) if connection.page_info.has_next_page => cursor = Some(next),
                _ => return Ok(branches),
            }
        }
    }
}
