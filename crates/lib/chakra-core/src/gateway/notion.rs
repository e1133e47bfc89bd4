use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::{
    BlockChildrenRequest,
    CreatePageRequest,
    GatewayError,
    GatewayResult,
    QueryDatabaseRequest,
    RemoteGateway,
    SearchRequest,
    UpdatePageRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_PAGE_SIZE: u32 = 100;

/// Connection settings for the Notion HTTP API.
#[derive(Debug, Clone)]
pub struct NotionClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub notion_version: String,
    pub request_timeout: Duration,
    pub page_size: u32,
}

impl NotionClientConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            notion_version: DEFAULT_NOTION_VERSION.to_string(),
            request_timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_notion_version(mut self, notion_version: impl Into<String>) -> Self {
        self.notion_version = notion_version.into();
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// HTTP gateway to the Notion REST API.
#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl NotionClient {
    /// Builds a client that sends the integration token and API version on
    /// every request.
    ///
    /// # Errors
    /// Returns `GatewayError::Config` if the token or version cannot be sent
    /// as a header or the HTTP client cannot be built.
    pub fn new(config: NotionClientConfig) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| GatewayError::Config("API key is not a valid header value".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let version = HeaderValue::from_str(&config.notion_version).map_err(|_| {
            GatewayError::Config(format!("invalid Notion version: {}", config.notion_version))
        })?;
        headers.insert(HeaderName::from_static("notion-version"), version);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| GatewayError::Config(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.clamp(1, DEFAULT_PAGE_SIZE),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> GatewayResult<Value> {
        let response = request.send().await.map_err(map_reqwest_err)?;
        let status = response.status();
        if status.is_success() {
            return response.json::<Value>().await.map_err(map_reqwest_err);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn search_all_databases(&self) -> GatewayResult<Vec<Value>> {
        let mut databases = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = database_search_body(cursor.as_deref(), self.page_size);
            let page = self.send(self.http.post(self.url("search")).json(&body)).await?;
            let (results, next_cursor) = split_page(page)?;
            debug!(count = results.len(), "fetched database page");
            databases.extend(results);
            match next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(databases)
    }
}

impl RemoteGateway for NotionClient {
    fn list_databases(&self) -> BoxFuture<'_, GatewayResult<Vec<Value>>> {
        self.search_all_databases().boxed()
    }

    fn get_database<'a>(&'a self, database_id: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            let url = self.url(&format!("databases/{database_id}"));
            self.send(self.http.get(url)).await
        }
        .boxed()
    }

    fn query_database<'a>(
        &'a self,
        request: &'a QueryDatabaseRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            let url = self.url(&format!("databases/{}/query", request.database_id));
            self.send(self.http.post(url).json(&query_body(request))).await
        }
        .boxed()
    }

    fn search<'a>(&'a self, request: &'a SearchRequest) -> BoxFuture<'a, GatewayResult<Value>> {
        async move { self.send(self.http.post(self.url("search")).json(request)).await }.boxed()
    }

    fn create_page<'a>(
        &'a self,
        request: &'a CreatePageRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            self.send(self.http.post(self.url("pages")).json(&create_page_body(request)))
                .await
        }
        .boxed()
    }

    fn update_page<'a>(
        &'a self,
        request: &'a UpdatePageRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            let url = self.url(&format!("pages/{}", request.page_id));
            let body = json!({
                "properties": request.properties,
                "archived": request.archived,
            });
            self.send(self.http.patch(url).json(&body)).await
        }
        .boxed()
    }

    fn get_block_children<'a>(
        &'a self,
        request: &'a BlockChildrenRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            let url = self.url(&format!("blocks/{}/children", request.block_id));
            let page_size = request.page_size.unwrap_or(self.page_size).to_string();
            let mut params = vec![("page_size", page_size)];
            if let Some(cursor) = request.start_cursor.as_ref() {
                params.push(("start_cursor", cursor.clone()));
            }
            self.send(self.http.get(url).query(&params)).await
        }
        .boxed()
    }

    fn append_block_children<'a>(
        &'a self,
        block_id: &'a str,
        children: &'a [Value],
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            let url = self.url(&format!("blocks/{block_id}/children"));
            self.send(self.http.patch(url).json(&json!({ "children": children })))
                .await
        }
        .boxed()
    }

    fn update_block<'a>(
        &'a self,
        block_id: &'a str,
        payload: &'a Value,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            let url = self.url(&format!("blocks/{block_id}"));
            self.send(self.http.patch(url).json(payload)).await
        }
        .boxed()
    }

    fn delete_block<'a>(&'a self, block_id: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
        async move {
            let url = self.url(&format!("blocks/{block_id}"));
            self.send(self.http.delete(url)).await
        }
        .boxed()
    }
}

fn map_reqwest_err(err: reqwest::Error) -> GatewayError {
    if err.is_decode() {
        GatewayError::Decode(err.to_string())
    } else {
        GatewayError::Transport(err.to_string())
    }
}

/// Prefers the `message` field of an API error body, falling back to the raw
/// text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn database_search_body(cursor: Option<&str>, page_size: u32) -> Value {
    let mut body = json!({
        "filter": { "property": "object", "value": "database" },
        "page_size": page_size,
    });
    if let (Some(cursor), Some(map)) = (cursor, body.as_object_mut()) {
        map.insert("start_cursor".to_string(), Value::String(cursor.to_string()));
    }
    body
}

fn query_body(request: &QueryDatabaseRequest) -> Value {
    let mut body = Map::new();
    if let Some(filter) = request.filter.as_ref() {
        body.insert("filter".to_string(), filter.clone());
    }
    if let Some(sorts) = request.sorts.as_ref() {
        body.insert("sorts".to_string(), sorts.clone());
    }
    if let Some(cursor) = request.start_cursor.as_ref() {
        body.insert("start_cursor".to_string(), Value::String(cursor.clone()));
    }
    if let Some(page_size) = request.page_size {
        body.insert("page_size".to_string(), Value::from(page_size));
    }
    Value::Object(body)
}

fn create_page_body(request: &CreatePageRequest) -> Value {
    let mut body = json!({
        "parent": { "database_id": request.database_id },
        "properties": request.properties,
    });
    if !request.children.is_empty()
        && let Some(map) = body.as_object_mut()
    {
        map.insert("children".to_string(), Value::Array(request.children.clone()));
    }
    body
}

/// Splits a paginated list response into its results and the cursor of the
/// next page, if any.
fn split_page(page: Value) -> GatewayResult<(Vec<Value>, Option<String>)> {
    let Value::Object(mut map) = page else {
        return Err(GatewayError::Decode("expected a list object".to_string()));
    };
    let Some(Value::Array(results)) = map.remove("results") else {
        return Err(GatewayError::Decode(
            "list response is missing results".to_string(),
        ));
    };
    let has_more = map.get("has_more").and_then(Value::as_bool).unwrap_or(false);
    let next_cursor = if has_more {
        map.remove("next_cursor")
            .and_then(|cursor| cursor.as_str().map(str::to_string))
    } else {
        None
    };
    Ok((results, next_cursor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_body_filters_databases_and_carries_cursor() {
        assert_eq!(
            database_search_body(None, 50),
            json!({
                "filter": { "property": "object", "value": "database" },
                "page_size": 50
            })
        );
        let next = database_search_body(Some("abc"), 100);
        assert_eq!(next["start_cursor"], json!("abc"));
    }

    #[test]
    fn query_body_omits_absent_options() {
        let request = QueryDatabaseRequest {
            database_id: "db".to_string(),
            filter: Some(json!({ "property": "Done", "checkbox": { "equals": false } })),
            page_size: Some(10),
            ..QueryDatabaseRequest::default()
        };
        assert_eq!(
            query_body(&request),
            json!({
                "filter": { "property": "Done", "checkbox": { "equals": false } },
                "page_size": 10
            })
        );
    }

    #[test]
    fn create_page_body_targets_database_parent() {
        let request = CreatePageRequest {
            database_id: "db".to_string(),
            properties: json!({ "Name": { "title": [] } }),
            children: Vec::new(),
        };
        assert_eq!(
            create_page_body(&request),
            json!({
                "parent": { "database_id": "db" },
                "properties": { "Name": { "title": [] } }
            })
        );
    }

    #[test]
    fn split_page_follows_cursor_only_when_more() {
        let (results, cursor) = split_page(json!({
            "object": "list",
            "results": [{ "id": "A1" }],
            "has_more": true,
            "next_cursor": "c2"
        }))
        .expect("page");
        assert_eq!(results.len(), 1);
        assert_eq!(cursor.as_deref(), Some("c2"));

        let (_, cursor) = split_page(json!({
            "results": [],
            "has_more": false,
            "next_cursor": "stale"
        }))
        .expect("page");
        assert_eq!(cursor, None);

        assert!(matches!(
            split_page(json!({ "object": "error" })),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn error_message_prefers_api_message() {
        assert_eq!(
            error_message(r#"{"object":"error","status":404,"message":"Could not find database"}"#),
            "Could not find database"
        );
        assert_eq!(error_message(" upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn client_rejects_unsendable_api_key() {
        let result = NotionClient::new(NotionClientConfig::new("bad\nkey"));
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
