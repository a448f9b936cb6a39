//! DuckDuckGo instant answer adapter

use async_trait::async_trait;
use product_scout_domain::{
    SearchAdapter, SearchEngineKind, SearchError, SearchLog, SearchResult, extract_urls,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{check_status, http_client, send_error};

pub const DEFAULT_BASE_URL: &str = "https://api.duckduckgo.com";

pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default, rename = "Abstract")]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    results: Vec<Entry>,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
    #[serde(default)]
    infobox: Value,
}

/// A related topic is either a named group of nested topics or a leaf entry
#[derive(Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Name", default)]
        name: String,
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
    Entry(Entry),
}

#[derive(Deserialize, Default)]
struct Entry {
    #[serde(rename = "FirstURL", default)]
    first_url: Option<String>,
    #[serde(rename = "URL", default)]
    url: Option<String>,
    #[serde(rename = "Text", default)]
    text: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Flatten arbitrarily nested topic groups. Uses an explicit stack; groups
/// are labelled `RelatedTopics > Group > Subgroup`.
fn flatten_topics(topics: Vec<RelatedTopic>, log: &mut SearchLog) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let mut stack: Vec<(String, std::vec::IntoIter<RelatedTopic>)> =
        vec![("RelatedTopics".to_string(), topics.into_iter())];

    while let Some((label, iter)) = stack.last_mut() {
        let Some(topic) = iter.next() else {
            stack.pop();
            continue;
        };

        match topic {
            RelatedTopic::Group { name, topics } => {
                let name = if name.is_empty() { "unnamed" } else { name.as_str() };
                log.record(format!("Nested topic group: {}", name));
                let child = format!("{} > {}", label, name);
                stack.push((child, topics.into_iter()));
            }
            RelatedTopic::Entry(entry) => {
                let (Some(url), Some(text)) = (non_empty(&entry.first_url), non_empty(&entry.text))
                else {
                    continue;
                };
                let (title, description) = match text.split_once(" - ") {
                    Some((title, rest)) if !title.is_empty() => {
                        (title, rest.split(" - ").next().unwrap_or_default())
                    }
                    _ => (text, ""),
                };
                results.push(
                    SearchResult::new(title, url, label.as_str()).with_description(description),
                );
            }
        }
    }

    results
}

fn infobox_results(infobox: &Value) -> Vec<SearchResult> {
    let Some(items) = infobox.get("content").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let value = item.get("value")?.as_str()?;
            let url = extract_urls(value).into_iter().next()?;
            let label = item
                .get("label")
                .and_then(Value::as_str)
                .filter(|l| !l.is_empty())
                .unwrap_or("Infobox");
            let description = value.replacen(&url, "", 1).trim().to_string();
            Some(SearchResult::new(label, url, "Infobox").with_description(description))
        })
        .collect()
}

fn collect_results(answer: InstantAnswer, log: &mut SearchLog) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if !answer.abstract_url.trim().is_empty() {
        log.record(format!("Abstract URL: {}", answer.abstract_url));
        let title = if answer.heading.is_empty() {
            "Abstract"
        } else {
            answer.heading.as_str()
        };
        results.push(
            SearchResult::new(title, answer.abstract_url.as_str(), "Abstract")
                .with_description(answer.abstract_text.as_str()),
        );
    }

    log.record(format!("Results: {}", answer.results.len()));
    for entry in &answer.results {
        let Some(url) = non_empty(&entry.first_url).or(non_empty(&entry.url)) else {
            continue;
        };
        let title = non_empty(&entry.text)
            .or(non_empty(&entry.name))
            .unwrap_or("Result");
        results.push(
            SearchResult::new(title, url, "Results")
                .with_description(non_empty(&entry.description).unwrap_or_default()),
        );
    }

    log.record(format!("Related topics: {}", answer.related_topics.len()));
    results.extend(flatten_topics(answer.related_topics, log));

    let infobox = infobox_results(&answer.infobox);
    if !infobox.is_empty() {
        log.record(format!("Infobox URLs: {}", infobox.len()));
    }
    results.extend(infobox);

    results
}

#[async_trait]
impl SearchAdapter for DuckDuckGoSearch {
    fn engine(&self) -> SearchEngineKind {
        SearchEngineKind::DuckDuckGo
    }

    async fn search(
        &self,
        query: &str,
        log: &mut SearchLog,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/", self.base_url);
        log.record(format!("DuckDuckGo API request: {}", query));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(send_error)?;

        log.record(format!("DuckDuckGo API status: {}", response.status().as_u16()));
        let response = check_status(response).await?;

        // The API sometimes answers with a JavaScript content type
        let body = response.text().await.map_err(send_error)?;
        let answer: InstantAnswer = serde_json::from_str(&body)
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        let results = collect_results(answer, log);
        tracing::debug!(engine = "duckduckgo", results = results.len(), "Parsed instant answer");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use product_scout_domain::SystemClock;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn log() -> SearchLog {
        SearchLog::new(Arc::new(SystemClock))
    }

    fn sample_answer() -> serde_json::Value {
        serde_json::json!({
            "Heading": "iPhone",
            "Abstract": "The iPhone is a line of smartphones.",
            "AbstractURL": "https://en.wikipedia.org/wiki/IPhone",
            "Results": [
                {"FirstURL": "https://www.apple.com/iphone/", "Text": "Official site"}
            ],
            "RelatedTopics": [
                {"FirstURL": "https://duckduckgo.com/IPhone_15_Pro", "Text": "iPhone 15 Pro - A smartphone by Apple"},
                {"Name": "Models", "Topics": [
                    {"FirstURL": "https://duckduckgo.com/IPhone_14", "Text": "iPhone 14 - Previous model"},
                    {"Name": "Older", "Topics": [
                        {"FirstURL": "https://duckduckgo.com/IPhone_X", "Text": "iPhone X"}
                    ]}
                ]},
                {"Text": "no url here"}
            ],
            "Infobox": {"content": [
                {"label": "Website", "value": "https://www.apple.com/iphone official"},
                {"label": "Developer", "value": "Apple Inc."}
            ]}
        })
    }

    #[test]
    fn test_collects_every_section() {
        let answer: InstantAnswer = serde_json::from_value(sample_answer()).unwrap();
        let results = collect_results(answer, &mut log());

        let sources: Vec<_> = results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "Abstract",
                "Results",
                "RelatedTopics",
                "RelatedTopics > Models",
                "RelatedTopics > Models > Older",
                "Infobox"
            ]
        );

        assert_eq!(results[2].title, "iPhone 15 Pro");
        assert_eq!(results[2].description.as_deref(), Some("A smartphone by Apple"));
        assert_eq!(results[4].title, "iPhone X");
        assert!(results[4].description.is_none());
        assert_eq!(results[5].url, "https://www.apple.com/iphone");
        assert_eq!(results[5].description.as_deref(), Some("official"));
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let mut topic = serde_json::json!({"FirstURL": "https://leaf", "Text": "Leaf"});
        for i in 0..100 {
            topic = serde_json::json!({"Name": format!("g{i}"), "Topics": [topic]});
        }
        let topics: Vec<RelatedTopic> = serde_json::from_value(serde_json::json!([topic])).unwrap();

        let results = flatten_topics(topics, &mut log());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://leaf");
    }

    #[tokio::test]
    async fn test_search_sends_instant_answer_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("q", "iPhone 15"))
            .and(query_param("format", "json"))
            .and(query_param("no_html", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sample_answer().to_string())
                    .insert_header("content-type", "application/x-javascript"),
            )
            .mount(&mock_server)
            .await;

        let adapter = DuckDuckGoSearch::with_base_url(mock_server.uri());
        let mut log = log();
        let results = adapter.search("iPhone 15", &mut log).await.unwrap();

        assert_eq!(results.len(), 6);
        assert!(log.lines().iter().any(|l| l.contains("DuckDuckGo API status: 200")));
    }

    #[tokio::test]
    async fn test_server_error_is_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let adapter = DuckDuckGoSearch::with_base_url(mock_server.uri());
        let result = adapter.search("iPhone", &mut log()).await;

        assert!(matches!(result, Err(SearchError::Http { status: 503, .. })));
    }
}
