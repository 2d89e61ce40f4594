use crate::constants::tool_names;
use crate::error::FinteamError;
use crate::tools::traits::{required_str, Tool, ToolResult};
use crate::tools::ToolContext;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Web,
    /// Results restricted to the past week
    News,
}

/// DuckDuckGo search over the keyless HTML endpoint.
pub struct WebSearchTool {
    ctx: ToolContext,
    mode: SearchMode,
}

impl WebSearchTool {
    pub fn new(ctx: ToolContext, mode: SearchMode) -> Self {
        Self { ctx, mode }
    }

    fn default_max_results(&self) -> usize {
        match self.mode {
            SearchMode::Web => self.ctx.search_max_results,
            SearchMode::News => self.ctx.news_max_results,
        }
    }

    fn tool_name(&self) -> &'static str {
        self.mode.tool_name()
    }
}

impl SearchMode {
    pub fn tool_name(&self) -> &'static str {
        match self {
            SearchMode::Web => tool_names::DUCKDUCKGO_SEARCH,
            SearchMode::News => tool_names::DUCKDUCKGO_NEWS,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        self.tool_name()
    }

    fn description(&self) -> &str {
        match self.mode {
            SearchMode::Web => {
                "Search the web with DuckDuckGo. Returns results with titles, URLs, and snippets. Use it to find sources for any claim."
            }
            SearchMode::News => {
                "Search DuckDuckGo for recent news (past week). Returns headlines with URLs and snippets."
            }
        }
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": format!("Maximum number of results to return (default: {})", self.default_max_results())
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let name = self.tool_name();
        let query = required_str(&params, name, "query")?;
        let max_results = params
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or_else(|| self.default_max_results());

        let mut request = self
            .ctx
            .http
            .get(&self.ctx.search_base_url)
            .query(&[("q", query)]);
        if self.mode == SearchMode::News {
            request = request.query(&[("df", "w")]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FinteamError::tool(name, format!("Search request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(FinteamError::tool(
                name,
                format!("Search returned HTTP {}", response.status()),
            ));
        }
        let html = response
            .text()
            .await
            .map_err(|e| FinteamError::tool(name, format!("Failed to read response: {e}")))?;

        let results = parse_ddg_results(&html, max_results);
        tracing::debug!(tool = name, query, hits = results.len(), "search finished");

        Ok(serde_json::json!({
            "query": query,
            "results": results,
            "count": results.len(),
        }))
    }
}

/// Extracts hits from DuckDuckGo's HTML results page: links carry
/// `class="result__a"` and snippets `class="result__snippet"`.
pub fn parse_ddg_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    html.split("class=\"result__a\"")
        .skip(1)
        .filter_map(parse_result_segment)
        .take(max_results)
        .collect()
}

fn parse_result_segment(segment: &str) -> Option<SearchHit> {
    let href = extract_between(segment, "href=\"", "\"")?;
    // Relative links point back into DuckDuckGo itself (ads, pagination)
    let url = unwrap_redirect(&decode_entities(href))?;

    let title = extract_between(segment, ">", "</a>").unwrap_or_default();
    let snippet = segment
        .find("class=\"result__snippet\"")
        .and_then(|start| {
            let rest = &segment[start..];
            extract_between(rest, ">", "</a>").or_else(|| extract_between(rest, ">", "</"))
        })
        .unwrap_or_default();

    Some(SearchHit {
        title: clean_text(title),
        url,
        snippet: clean_text(snippet),
    })
}

/// Result links are wrapped as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn unwrap_redirect(href: &str) -> Option<String> {
    if let Some(encoded) = href.split("uddg=").nth(1) {
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        return urlencoding::decode(encoded).ok().map(|u| u.into_owned());
    }
    if href.is_empty() || href.starts_with('/') {
        return None;
    }
    Some(href.to_string())
}

fn extract_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let start_idx = text.find(start)? + start.len();
    let remaining = &text[start_idx..];
    let end_idx = remaining.find(end)?;
    Some(&remaining[..end_idx])
}

fn clean_text(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    decode_entities(text.split_whitespace().collect::<Vec<_>>().join(" ").as_str())
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="result results_links">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fnvidianews.nvidia.com%2Fq3&amp;rut=abc">NVIDIA <b>Q3</b> Results</a>
          <a class="result__snippet" href="x">Record revenue of <b>$35.1 billion</b>, up 94%</a>
        </div>
        <div class="result">
          <a class="result__a" href="/y.js?ad_provider=bing">Sponsored</a>
        </div>
        <div class="result">
          <a class="result__a" href="https://www.amd.com/en/newsroom">AMD &amp; AI</a>
          <a class="result__snippet" href="y">Data center segment grew</a>
        </div>
    "#;

    #[test]
    fn test_parse_unwraps_redirects_and_strips_tags() {
        let hits = parse_ddg_results(PAGE, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://nvidianews.nvidia.com/q3");
        assert_eq!(hits[0].title, "NVIDIA Q3 Results");
        assert_eq!(hits[0].snippet, "Record revenue of $35.1 billion, up 94%");
        assert_eq!(hits[1].title, "AMD & AI");
        assert_eq!(hits[1].url, "https://www.amd.com/en/newsroom");
    }

    #[test]
    fn test_parse_respects_max_results() {
        let hits = parse_ddg_results(PAGE, 1);
        assert_eq!(hits.len(), 1);
        assert!(parse_ddg_results("<html>no results</html>", 5).is_empty());
    }
}
