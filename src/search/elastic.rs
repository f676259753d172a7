//! Elasticsearch/OpenSearch adapter over the REST API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{
    document::{SearchDocument, SearchQuery},
    index::{DocumentIndex, SearchError},
    memory::MemoryIndex,
};

/// When a write becomes visible to searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Refresh the affected shard before answering.
    #[default]
    Immediate,
    /// Answer once a scheduled refresh has made the write visible.
    WaitFor,
    /// Leave visibility to the index refresh interval.
    Background,
}

impl RefreshPolicy {
    fn as_param(self) -> &'static str {
        match self {
            RefreshPolicy::Immediate => "true",
            RefreshPolicy::WaitFor => "wait_for",
            RefreshPolicy::Background => "false",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// In-process indices are used when unset.
    pub url: Option<String>,
    pub lists_index: String,
    pub items_index: String,
    pub refresh: RefreshPolicy,
    pub max_hits: usize,
    pub timeout: Duration,
}

impl From<&crate::config::SearchSettings> for SearchConfig {
    fn from(settings: &crate::config::SearchSettings) -> Self {
        Self {
            url: settings.url.clone(),
            lists_index: settings.lists_index.clone(),
            items_index: settings.items_index.clone(),
            refresh: settings.refresh,
            max_hits: settings.max_hits.get(),
            timeout: settings.timeout,
        }
    }
}

impl SearchConfig {
    /// Builds the list and item indices, creating remote ones when missing.
    pub async fn connect(
        &self,
    ) -> Result<(Arc<dyn DocumentIndex>, Arc<dyn DocumentIndex>), SearchError> {
        let Some(url) = self.url.as_deref() else {
            info!(target: "tasklane::search", "Using in-process search indices");
            return Ok((
                Arc::new(MemoryIndex::new(&self.lists_index)),
                Arc::new(MemoryIndex::new(&self.items_index)),
            ));
        };

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("tasklane/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SearchError::transport)?;

        let lists = ElasticIndex::new(client.clone(), url, &self.lists_index, self)?;
        let items = ElasticIndex::new(client, url, &self.items_index, self)?;
        lists.ensure_index().await?;
        items.ensure_index().await?;

        Ok((Arc::new(lists), Arc::new(items)))
    }
}

pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index: String,
    refresh: RefreshPolicy,
    max_hits: usize,
}

impl ElasticIndex {
    pub fn new(
        client: Client,
        base_url: &str,
        index: &str,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        if index.is_empty() {
            return Err(SearchError::transport("index name must not be empty"));
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            refresh: config.refresh,
            max_hits: config.max_hits,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}{path}", self.base_url, self.index)
    }

    /// Creates the index with an explicit mapping unless it already exists.
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        let probe = self
            .client
            .request(Method::HEAD, self.url(""))
            .send()
            .await
            .map_err(SearchError::transport)?;
        if probe.status().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.url(""))
            .json(&index_mapping())
            .send()
            .await
            .map_err(SearchError::transport)?;
        let status = response.status();
        if status.is_success() {
            info!(target: "tasklane::search", index = %self.index, "Created search index");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // Another process may have created it between the probe and the PUT.
        if status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception")
        {
            return Ok(());
        }
        Err(SearchError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentIndex for ElasticIndex {
    fn name(&self) -> &str {
        &self.index
    }

    async fn search_ids(&self, query: &SearchQuery) -> Result<Vec<i64>, SearchError> {
        let response = self
            .client
            .post(self.url("/_search"))
            .json(&build_query(query, self.max_hits))
            .send()
            .await
            .map_err(SearchError::transport)?;
        let response = expect_success(response).await?;

        let body: SearchResponse = response.json().await.map_err(SearchError::decode)?;
        let ids = body
            .hits
            .hits
            .into_iter()
            .map(Hit::into_id)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            target: "tasklane::search",
            index = %self.index,
            hits = ids.len(),
            "Search answered"
        );
        Ok(ids)
    }

    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchError> {
        let response = self
            .client
            .put(self.url(&format!(
                "/_doc/{}?refresh={}",
                document.id,
                self.refresh.as_param()
            )))
            .json(document)
            .send()
            .await
            .map_err(SearchError::transport)?;
        expect_success(response).await.map(|_| ())
    }

    async fn delete(&self, id: i64) -> Result<(), SearchError> {
        let response = self
            .client
            .delete(self.url(&format!(
                "/_doc/{id}?refresh={}",
                self.refresh.as_param()
            )))
            .send()
            .await
            .map_err(SearchError::transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(target: "tasklane::search", index = %self.index, id, "Document already absent");
            return Ok(());
        }
        expect_success(response).await.map(|_| ())
    }
}

async fn expect_success(response: Response) -> Result<Response, SearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SearchError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Fuzzy text match on title (boosted) and description, exact owner and
/// scalar filters, ids only in the response.
pub(crate) fn build_query(query: &SearchQuery, max_hits: usize) -> Value {
    let mut filters = vec![json!({ "term": { "userId": query.user_id } })];
    if let Some(list_id) = query.list_id {
        filters.push(json!({ "term": { "listId": list_id } }));
    }
    if let Some(done) = query.done {
        filters.push(json!({ "term": { "done": done } }));
    }

    json!({
        "size": max_hits,
        "_source": ["id"],
        "query": {
            "bool": {
                "must": [{
                    "multi_match": {
                        "query": query.text,
                        "fields": ["title^2", "description"],
                        "fuzziness": "AUTO"
                    }
                }],
                "filter": filters
            }
        }
    })
}

fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "long" },
                "userId": { "type": "long" },
                "listId": { "type": "long" },
                "title": { "type": "text" },
                "description": { "type": "text" },
                "done": { "type": "boolean" }
            }
        }
    })
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    doc_id: String,
    #[serde(rename = "_source")]
    source: Option<HitSource>,
}

#[derive(Deserialize)]
struct HitSource {
    id: Option<i64>,
}

impl Hit {
    fn into_id(self) -> Result<i64, SearchError> {
        match self.source.and_then(|source| source.id) {
            Some(id) => Ok(id),
            None => self
                .doc_id
                .parse()
                .map_err(|_| SearchError::decode(format!("non-numeric id `{}`", self.doc_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ItemFilter;

    #[test]
    fn list_query_filters_only_on_owner() {
        let query = build_query(&SearchQuery::new(7, "grocer"), 25);

        assert_eq!(query["size"], 25);
        assert_eq!(query["_source"], json!(["id"]));
        let must = &query["query"]["bool"]["must"][0]["multi_match"];
        assert_eq!(must["query"], "grocer");
        assert_eq!(must["fields"], json!(["title^2", "description"]));
        assert_eq!(must["fuzziness"], "AUTO");
        assert_eq!(
            query["query"]["bool"]["filter"],
            json!([{ "term": { "userId": 7 } }])
        );
    }

    #[test]
    fn item_query_adds_list_and_done_filters() {
        let query = SearchQuery::new(1, "milk").with_filter(ItemFilter {
            list_id: Some(3),
            done: Some(false),
        });
        let built = build_query(&query, 10);

        assert_eq!(
            built["query"]["bool"]["filter"],
            json!([
                { "term": { "userId": 1 } },
                { "term": { "listId": 3 } },
                { "term": { "done": false } }
            ])
        );
    }

    #[test]
    fn hits_prefer_source_id_and_fall_back_to_doc_id() {
        let body = json!({
            "hits": { "hits": [
                { "_id": "11", "_source": { "id": 11 } },
                { "_id": "12" },
                { "_id": "13", "_source": {} }
            ] }
        });
        let parsed: SearchResponse = serde_json::from_value(body).expect("decode");
        let ids = parsed
            .hits
            .hits
            .into_iter()
            .map(Hit::into_id)
            .collect::<Result<Vec<_>, _>>()
            .expect("ids");
        assert_eq!(ids, vec![11, 12, 13]);
    }

    #[test]
    fn refresh_policy_maps_to_query_parameter() {
        assert_eq!(RefreshPolicy::Immediate.as_param(), "true");
        assert_eq!(RefreshPolicy::WaitFor.as_param(), "wait_for");
        assert_eq!(RefreshPolicy::Background.as_param(), "false");
    }
}
