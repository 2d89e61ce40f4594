use crate::constants::{limits, tool_names};
use crate::error::FinteamError;
use crate::tools::traits::{required_str, Tool, ToolResult};
use crate::tools::{FinanceOptions, ToolContext};
use serde_json::{json, Map, Value};

/// One Yahoo Finance lookup, exposed to the model as its own function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinanceFeature {
    StockPrice,
    AnalystRecommendations,
    CompanyInfo,
    CompanyNews,
    StockFundamentals,
    HistoricalPrices,
}

impl FinanceFeature {
    /// Features switched on in `options`, in a stable order.
    pub fn enabled(options: &FinanceOptions) -> Vec<FinanceFeature> {
        [
            (options.stock_price, Self::StockPrice),
            (options.analyst_recommendations, Self::AnalystRecommendations),
            (options.company_info, Self::CompanyInfo),
            (options.company_news, Self::CompanyNews),
            (options.stock_fundamentals, Self::StockFundamentals),
            (options.historical_prices, Self::HistoricalPrices),
        ]
        .into_iter()
        .filter_map(|(on, feature)| on.then_some(feature))
        .collect()
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::StockPrice => tool_names::STOCK_PRICE,
            Self::AnalystRecommendations => tool_names::ANALYST_RECOMMENDATIONS,
            Self::CompanyInfo => tool_names::COMPANY_INFO,
            Self::CompanyNews => tool_names::COMPANY_NEWS,
            Self::StockFundamentals => tool_names::STOCK_FUNDAMENTALS,
            Self::HistoricalPrices => tool_names::HISTORICAL_PRICES,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::StockPrice => "Get the current stock price for a ticker symbol.",
            Self::AnalystRecommendations => {
                "Get analyst recommendation counts (strong buy to strong sell) for recent months."
            }
            Self::CompanyInfo => {
                "Get company profile and overview: sector, industry, market cap, employees, business summary."
            }
            Self::CompanyNews => "Get the latest news headlines for a company.",
            Self::StockFundamentals => {
                "Get fundamental data: P/E ratios, margins, growth, beta, dividend yield, 52-week range."
            }
            Self::HistoricalPrices => {
                "Get historical OHLCV prices for a ticker over a period (e.g. 1mo, 6mo, 1y) and interval (1d, 1wk, 1mo)."
            }
        }
    }

    fn quote_summary_modules(&self) -> Option<&'static str> {
        match self {
            Self::AnalystRecommendations => Some("recommendationTrend"),
            Self::CompanyInfo => Some("assetProfile,price,summaryDetail"),
            Self::StockFundamentals => Some("defaultKeyStatistics,financialData,summaryDetail,price"),
            _ => None,
        }
    }
}

pub struct FinanceTool {
    ctx: ToolContext,
    feature: FinanceFeature,
}

impl FinanceTool {
    pub fn new(ctx: ToolContext, feature: FinanceFeature) -> Self {
        Self { ctx, feature }
    }

    fn err(&self, message: impl Into<String>) -> FinteamError {
        FinteamError::tool(self.feature.tool_name(), message)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FinteamError> {
        let url = format!("{}{}", self.ctx.finance_base_url.trim_end_matches('/'), path);
        let response = self
            .ctx
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.err(format!("request failed: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| self.err(format!("unreadable response ({status}): {e}")))?;
        if !status.is_success() {
            return Err(self.err(format!("Yahoo Finance returned HTTP {status}: {}", yahoo_error(&body))));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Tool for FinanceTool {
    fn name(&self) -> &str {
        self.feature.tool_name()
    }

    fn description(&self) -> &str {
        self.feature.description()
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = json!({
            "symbol": {
                "type": "string",
                "description": "Ticker symbol, e.g. NVDA"
            }
        });
        if self.feature == FinanceFeature::HistoricalPrices {
            properties["period"] = json!({
                "type": "string",
                "description": "Range: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, ytd, max (default: 1mo)"
            });
            properties["interval"] = json!({
                "type": "string",
                "description": "Bar size: 1d, 5d, 1wk, 1mo, 3mo (default: 1d)"
            });
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": ["symbol"]
        })
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let symbol = required_str(&params, self.name(), "symbol")?.to_uppercase();
        let encoded = urlencoding::encode(&symbol).into_owned();

        let result = match self.feature {
            FinanceFeature::StockPrice => {
                let body = self
                    .get_json(
                        &format!("/v8/finance/chart/{encoded}"),
                        &[("range", "1d".into()), ("interval", "1d".into())],
                    )
                    .await?;
                summarize_price(&body)
            }
            FinanceFeature::HistoricalPrices => {
                let period = params.get("period").and_then(|v| v.as_str()).unwrap_or("1mo");
                let interval = params.get("interval").and_then(|v| v.as_str()).unwrap_or("1d");
                let body = self
                    .get_json(
                        &format!("/v8/finance/chart/{encoded}"),
                        &[("range", period.into()), ("interval", interval.into())],
                    )
                    .await?;
                summarize_history(&body)
            }
            FinanceFeature::CompanyNews => {
                let body = self
                    .get_json(
                        "/v1/finance/search",
                        &[
                            ("q", symbol.clone()),
                            ("quotesCount", "0".into()),
                            ("newsCount", limits::COMPANY_NEWS_ITEMS.to_string()),
                        ],
                    )
                    .await?;
                Some(summarize_news(&body))
            }
            feature => {
                let modules = feature.quote_summary_modules().unwrap_or_default();
                let body = self
                    .get_json(
                        &format!("/v10/finance/quoteSummary/{encoded}"),
                        &[("modules", modules.into())],
                    )
                    .await?;
                let summary = quote_summary(&body);
                summary.map(|s| match feature {
                    FinanceFeature::AnalystRecommendations => summarize_recommendations(s),
                    FinanceFeature::CompanyInfo => summarize_company(s),
                    _ => summarize_fundamentals(s),
                })
            }
        };

        let mut value = result.ok_or_else(|| self.err(format!("no data returned for {symbol}")))?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("symbol".into(), Value::String(symbol));
        }
        Ok(value)
    }
}

/// Yahoo wraps numbers as `{"raw": 1.23, "fmt": "1.23"}`; keep the raw value.
fn raw(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Object(map)) => map.get("raw").cloned().unwrap_or(Value::Null),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

fn pick(source: &Value, fields: &[(&str, &str)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(from, to)| (to.to_string(), raw(source.get(*from))))
        .filter(|(_, v)| !v.is_null())
        .collect()
}

fn yahoo_error(body: &Value) -> String {
    ["chart", "quoteSummary", "finance"]
        .iter()
        .find_map(|k| body.get(*k)?.get("error")?.get("description")?.as_str())
        .unwrap_or("unknown error")
        .to_string()
}

fn chart_result(body: &Value) -> Option<&Value> {
    body.get("chart")?.get("result")?.as_array()?.first()
}

fn quote_summary(body: &Value) -> Option<&Value> {
    body.get("quoteSummary")?.get("result")?.as_array()?.first()
}

pub(crate) fn summarize_price(body: &Value) -> Option<Value> {
    let meta = chart_result(body)?.get("meta")?;
    let price = meta.get("regularMarketPrice")?.as_f64()?;
    let mut out = json!({ "price": price });
    let obj = out.as_object_mut()?;
    obj.extend(pick(
        meta,
        &[
            ("currency", "currency"),
            ("chartPreviousClose", "previous_close"),
            ("regularMarketDayHigh", "day_high"),
            ("regularMarketDayLow", "day_low"),
            ("fiftyTwoWeekHigh", "fifty_two_week_high"),
            ("fiftyTwoWeekLow", "fifty_two_week_low"),
            ("exchangeName", "exchange"),
        ],
    ));
    if let Some(prev) = meta.get("chartPreviousClose").and_then(|v| v.as_f64()) {
        if prev != 0.0 {
            let change = (price - prev) / prev * 100.0;
            obj.insert("change_percent".into(), json!((change * 100.0).round() / 100.0));
        }
    }
    Some(out)
}

pub(crate) fn summarize_history(body: &Value) -> Option<Value> {
    let result = chart_result(body)?;
    let timestamps = result.get("timestamp")?.as_array()?;
    let quote = result.get("indicators")?.get("quote")?.as_array()?.first()?;
    let series = |key: &str| quote.get(key).and_then(|v| v.as_array());
    let (open, high, low, close, volume) = (
        series("open")?,
        series("high")?,
        series("low")?,
        series("close")?,
        series("volume")?,
    );

    let rows: Vec<Value> = timestamps
        .iter()
        .enumerate()
        .filter(|(i, _)| close.get(*i).is_some_and(|c| !c.is_null()))
        .map(|(i, ts)| {
            json!({
                "timestamp": ts,
                "open": open.get(i),
                "high": high.get(i),
                "low": low.get(i),
                "close": close.get(i),
                "volume": volume.get(i),
            })
        })
        .collect();

    Some(json!({
        "currency": result.get("meta").and_then(|m| m.get("currency")),
        "prices": rows,
    }))
}

pub(crate) fn summarize_recommendations(summary: &Value) -> Value {
    let trend: Vec<Value> = summary
        .get("recommendationTrend")
        .and_then(|r| r.get("trend"))
        .and_then(|t| t.as_array())
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    Value::Object(pick(
                        row,
                        &[
                            ("period", "period"),
                            ("strongBuy", "strong_buy"),
                            ("buy", "buy"),
                            ("hold", "hold"),
                            ("sell", "sell"),
                            ("strongSell", "strong_sell"),
                        ],
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "recommendations": trend })
}

pub(crate) fn summarize_company(summary: &Value) -> Value {
    let empty = Value::Null;
    let profile = summary.get("assetProfile").unwrap_or(&empty);
    let price = summary.get("price").unwrap_or(&empty);
    let detail = summary.get("summaryDetail").unwrap_or(&empty);

    let mut out = pick(
        price,
        &[
            ("longName", "name"),
            ("regularMarketPrice", "current_price"),
            ("currency", "currency"),
            ("marketCap", "market_cap"),
        ],
    );
    out.extend(pick(
        profile,
        &[
            ("sector", "sector"),
            ("industry", "industry"),
            ("website", "website"),
            ("country", "country"),
            ("fullTimeEmployees", "employees"),
            ("longBusinessSummary", "summary"),
        ],
    ));
    out.extend(pick(
        detail,
        &[
            ("trailingPE", "pe_ratio"),
            ("fiftyTwoWeekHigh", "fifty_two_week_high"),
            ("fiftyTwoWeekLow", "fifty_two_week_low"),
        ],
    ));
    Value::Object(out)
}

pub(crate) fn summarize_fundamentals(summary: &Value) -> Value {
    let empty = Value::Null;
    let stats = summary.get("defaultKeyStatistics").unwrap_or(&empty);
    let financial = summary.get("financialData").unwrap_or(&empty);
    let detail = summary.get("summaryDetail").unwrap_or(&empty);
    let price = summary.get("price").unwrap_or(&empty);

    let mut out = pick(price, &[("longName", "name"), ("marketCap", "market_cap")]);
    out.extend(pick(
        detail,
        &[
            ("trailingPE", "trailing_pe"),
            ("forwardPE", "forward_pe"),
            ("dividendYield", "dividend_yield"),
            ("beta", "beta"),
            ("fiftyTwoWeekHigh", "fifty_two_week_high"),
            ("fiftyTwoWeekLow", "fifty_two_week_low"),
        ],
    ));
    out.extend(pick(
        stats,
        &[
            ("pegRatio", "peg_ratio"),
            ("priceToBook", "price_to_book"),
            ("trailingEps", "eps"),
        ],
    ));
    out.extend(pick(
        financial,
        &[
            ("totalRevenue", "total_revenue"),
            ("revenueGrowth", "revenue_growth"),
            ("grossMargins", "gross_margins"),
            ("profitMargins", "profit_margins"),
            ("returnOnEquity", "return_on_equity"),
            ("debtToEquity", "debt_to_equity"),
            ("freeCashflow", "free_cash_flow"),
        ],
    ));
    Value::Object(out)
}

pub(crate) fn summarize_news(body: &Value) -> Value {
    let items: Vec<Value> = body
        .get("news")
        .and_then(|n| n.as_array())
        .map(|news| {
            news.iter()
                .take(limits::COMPANY_NEWS_ITEMS)
                .map(|item| {
                    Value::Object(pick(
                        item,
                        &[
                            ("title", "title"),
                            ("publisher", "publisher"),
                            ("link", "link"),
                            ("providerPublishTime", "published_at"),
                        ],
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "news": items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_features_follow_options() {
        let options = FinanceOptions {
            stock_price: true,
            analyst_recommendations: true,
            company_info: true,
            ..FinanceOptions::none()
        };
        let names: Vec<&str> = FinanceFeature::enabled(&options)
            .iter()
            .map(|f| f.tool_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "get_current_stock_price",
                "get_analyst_recommendations",
                "get_company_info"
            ]
        );
    }

    #[test]
    fn test_summarize_price_computes_change() {
        let body = json!({
            "chart": {"result": [{"meta": {
                "currency": "USD",
                "regularMarketPrice": 110.0,
                "chartPreviousClose": 100.0,
                "exchangeName": "NMS"
            }}], "error": null}
        });
        let price = summarize_price(&body).unwrap();
        assert_eq!(price["price"], 110.0);
        assert_eq!(price["currency"], "USD");
        assert_eq!(price["change_percent"], 10.0);
    }

    #[test]
    fn test_summarize_price_missing_result() {
        let body = json!({"chart": {"result": null, "error": {"description": "No data found"}}});
        assert!(summarize_price(&body).is_none());
        assert_eq!(yahoo_error(&body), "No data found");
    }

    #[test]
    fn test_summarize_history_skips_null_closes() {
        let body = json!({
            "chart": {"result": [{
                "meta": {"currency": "USD"},
                "timestamp": [1, 2, 3],
                "indicators": {"quote": [{
                    "open": [1.0, 2.0, 3.0],
                    "high": [1.5, 2.5, 3.5],
                    "low": [0.5, 1.5, 2.5],
                    "close": [1.2, null, 3.2],
                    "volume": [10, 20, 30]
                }]}
            }]}
        });
        let history = summarize_history(&body).unwrap();
        let prices = history["prices"].as_array().unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1]["timestamp"], 3);
        assert_eq!(prices[1]["close"], 3.2);
    }

    #[test]
    fn test_summarize_recommendations_unwraps_raw() {
        let summary = json!({
            "recommendationTrend": {"trend": [
                {"period": "0m", "strongBuy": 12, "buy": {"raw": 40, "fmt": "40"}, "hold": 6, "sell": 0, "strongSell": 0}
            ]}
        });
        let recs = summarize_recommendations(&summary);
        assert_eq!(recs["recommendations"][0]["period"], "0m");
        assert_eq!(recs["recommendations"][0]["buy"], 40);
        assert_eq!(recs["recommendations"][0]["strong_buy"], 12);
    }

    #[test]
    fn test_summarize_company_merges_modules() {
        let summary = json!({
            "assetProfile": {"sector": "Technology", "industry": "Semiconductors", "fullTimeEmployees": 29600},
            "price": {"longName": "NVIDIA Corporation", "marketCap": {"raw": 3.4e12, "fmt": "3.4T"}},
            "summaryDetail": {"trailingPE": {"raw": 55.1}}
        });
        let info = summarize_company(&summary);
        assert_eq!(info["name"], "NVIDIA Corporation");
        assert_eq!(info["sector"], "Technology");
        assert_eq!(info["market_cap"], 3.4e12);
        assert_eq!(info["pe_ratio"], 55.1);
        assert!(info.get("website").is_none());
    }

    #[test]
    fn test_summarize_news_limits_items() {
        let news: Vec<Value> = (0..8)
            .map(|i| json!({"title": format!("headline {i}"), "publisher": "Reuters", "link": "https://example.com"}))
            .collect();
        let out = summarize_news(&json!({ "news": news }));
        assert_eq!(out["news"].as_array().unwrap().len(), limits::COMPANY_NEWS_ITEMS);
        assert_eq!(out["news"][0]["title"], "headline 0");
    }
}
