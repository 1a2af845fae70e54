//! DuckDuckGo web search over the HTML endpoint
//!
//! No API key is needed. Results are scraped from the `result__a` and
//! `result__snippet` anchors of the HTML results page.

use crate::config::NewsSettings;
use crate::error::{AdvisorError, Result};
use crate::sources::NewsSearch;
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

const PROVIDER: &str = "DuckDuckGo";

/// One web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Patterns used to pick results out of the HTML page
#[derive(Debug, Clone)]
struct ResultPatterns {
    title: Regex,
    snippet: Regex,
    href: Regex,
    tag: Regex,
    numeric_entity: Regex,
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| AdvisorError::ApiError(format!("invalid pattern {re}: {e}")))
}

impl ResultPatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            title: pattern(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#)?,
            snippet: pattern(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#)?,
            href: pattern(r#"href="([^"]*)""#)?,
            tag: pattern(r"<[^>]+>")?,
            numeric_entity: pattern(r"&#(x[0-9a-fA-F]+|[0-9]+);")?,
        })
    }

    /// Strip tags, decode entities and collapse whitespace
    fn clean(&self, html: &str) -> String {
        let text = self.tag.replace_all(html, "");
        let text = self.numeric_entity.replace_all(&text, |caps: &regex::Captures<'_>| {
            let code = &caps[1];
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse().ok(),
            };
            value
                .and_then(char::from_u32)
                .map_or_else(String::new, String::from)
        });
        let text = decode_named_entities(&text);
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn parse(&self, html: &str, limit: usize) -> Vec<SearchHit> {
        let titles: Vec<_> = self.title.captures_iter(html).collect();
        let mut hits = Vec::new();

        for (i, caps) in titles.iter().enumerate() {
            let Some(whole) = caps.get(0) else { continue };
            let href = self
                .href
                .captures(&caps[1])
                .map(|h| decode_named_entities(&h[1]))
                .unwrap_or_default();

            // Sponsored results go through the ad redirect
            if href.contains("duckduckgo.com/y.js") {
                continue;
            }

            // The snippet belongs to this result if it comes before the next title
            let segment_end = titles
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |next| next.start());
            let snippet = self
                .snippet
                .captures(&html[whole.end()..segment_end])
                .map(|s| self.clean(&s[1]))
                .unwrap_or_default();

            let title = self.clean(&caps[2]);
            if title.is_empty() {
                continue;
            }

            hits.push(SearchHit {
                title,
                url: resolve_redirect(&href),
                snippet,
            });
            if hits.len() >= limit {
                break;
            }
        }

        hits
    }
}

fn decode_named_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Result links point at `//duckduckgo.com/l/?uddg=<target>`; unwrap them
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}

/// Render hits as the text handed to the analyst
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for \"{query}\".\n");
    }

    let mut out = format!("Results for \"{query}\":\n");
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("\n{}. {}\n   {}\n", i + 1, hit.title, hit.url));
        if !hit.snippet.is_empty() {
            out.push_str(&format!("   {}\n", hit.snippet));
        }
    }
    out
}

/// DuckDuckGo search client
#[derive(Debug, Clone)]
pub struct DuckDuckGoClient {
    client: Client,
    base_url: String,
    max_results: usize,
    patterns: ResultPatterns,
}

impl DuckDuckGoClient {
    /// Create a client against the public endpoint
    pub fn new() -> Result<Self> {
        Self::from_settings(&NewsSettings::default())
    }

    /// Create a client from news settings
    pub fn from_settings(settings: &NewsSettings) -> Result<Self> {
        Ok(Self {
            client: super::http_client(settings.request_timeout_secs)?,
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            max_results: settings.max_results.max(1),
            patterns: ResultPatterns::new()?,
        })
    }

    /// Point the client at a different host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run a search and return up to `max_results` hits
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!("{}/html/", self.base_url);
        debug!("GET {url}");

        let response = self.client.get(&url).query(&[("q", query)]).send().await?;

        // A 202 carries the bot-check page instead of results
        match response.status() {
            StatusCode::OK => {}
            StatusCode::ACCEPTED | StatusCode::TOO_MANY_REQUESTS => {
                return Err(AdvisorError::RateLimitExceeded {
                    provider: PROVIDER.to_string(),
                });
            }
            status => {
                return Err(AdvisorError::ApiError(format!(
                    "{PROVIDER} search failed: HTTP {status}"
                )));
            }
        }

        let html = response.text().await?;
        Ok(self.patterns.parse(&html, self.max_results))
    }
}

#[async_trait]
impl NewsSearch for DuckDuckGoClient {
    async fn search_news(&self, query: &str) -> Result<String> {
        let hits = self.search(query).await?;
        info!("{} results for {:?}", hits.len(), query);
        Ok(format_hits(query, &hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_PAGE: &str = r#"
<div class="result results_links results_links_deep result--ad">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_domain=broker.example">Trade Now</a>
  </h2>
  <a class="result__snippet" href="https://duckduckgo.com/y.js?ad_domain=broker.example">Open an account</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fnews.example.com%2Ftata%2Dmotors%2Dq2&amp;rut=abc">Tata Motors Q2 <b>results</b>: profit rises</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fnews.example.com%2Ftata%2Dmotors%2Dq2">JLR volumes &amp; margins improved &#x27;strongly&#x27; this quarter.</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://markets.example.com/tatamotors">TATAMOTORS share price</a>
  </h2>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://third.example.com/">Third result</a>
  </h2>
  <a class="result__snippet" href="https://third.example.com/">Third snippet</a>
</div>
"#;

    fn client_for(server: &MockServer, max_results: usize) -> DuckDuckGoClient {
        let settings = NewsSettings {
            max_results,
            ..Default::default()
        };
        DuckDuckGoClient::from_settings(&settings)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_resolve_redirect() {
        assert_eq!(
            resolve_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.example%2Fx&rut=1"),
            "https://a.example/x"
        );
        assert_eq!(resolve_redirect("https://b.example/"), "https://b.example/");
    }

    #[test]
    fn test_parse_skips_ads_and_pairs_snippets() {
        let patterns = ResultPatterns::new().unwrap();
        let hits = patterns.parse(RESULTS_PAGE, 10);

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Tata Motors Q2 results: profit rises");
        assert_eq!(hits[0].url, "https://news.example.com/tata-motors-q2");
        assert_eq!(hits[0].snippet, "JLR volumes & margins improved 'strongly' this quarter.");
        // no snippet of its own; must not borrow the next one
        assert_eq!(hits[1].snippet, "");
        assert_eq!(hits[2].snippet, "Third snippet");
    }

    #[test]
    fn test_parse_respects_limit() {
        let patterns = ResultPatterns::new().unwrap();
        assert_eq!(patterns.parse(RESULTS_PAGE, 1).len(), 1);
        assert!(patterns.parse("<html></html>", 5).is_empty());
    }

    #[test]
    fn test_format_hits() {
        let hits = vec![SearchHit {
            title: "Headline".into(),
            url: "https://x.example".into(),
            snippet: "Body".into(),
        }];
        let text = format_hits("AAPL latest news", &hits);
        assert!(text.starts_with("Results for \"AAPL latest news\":"));
        assert!(text.contains("1. Headline\n   https://x.example\n   Body"));

        assert_eq!(format_hits("q", &[]), "No results found for \"q\".\n");
    }

    #[tokio::test]
    async fn test_search_news() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Tata Motors latest news"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server, 2)
            .search_news("Tata Motors latest news")
            .await
            .unwrap();
        assert!(text.contains("Tata Motors Q2 results"));
        assert!(text.contains("TATAMOTORS share price"));
        assert!(!text.contains("Third result"));
        assert!(!text.contains("Trade Now"));
    }

    #[tokio::test]
    async fn test_bot_check_is_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(202).set_body_string("<html>anomaly</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).search("AAPL").await.unwrap_err();
        assert!(matches!(err, AdvisorError::RateLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).search("AAPL").await.unwrap_err();
        assert!(matches!(err, AdvisorError::ApiError(_)));
    }
}
