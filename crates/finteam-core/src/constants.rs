/// Centralized constants for finteam.
/// Endpoints, default models, and limits live here.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
    pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
    pub const DEFAULT_TOGETHER_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";
    pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o";
    pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
    pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
    pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz";
    pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

    pub const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
    pub const YAHOO_FINANCE_URL: &str = "https://query1.finance.yahoo.com";
}

// ─── Default Settings ─────────────────────────────────────────────────────────

pub mod defaults {
    pub const MAX_ITERATIONS: usize = 10;
    pub const SEARCH_MAX_RESULTS: usize = 5;
    pub const NEWS_MAX_RESULTS: usize = 5;
    pub const HTTP_TIMEOUT_SECS: u64 = 15;
    pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; finteam/0.1)";
    pub const SECRET_FILE: &str = ".env";
    pub const TEAM_NAME: &str = "Agent Team";
}

// ─── Tool names ───────────────────────────────────────────────────────────────

pub mod tool_names {
    pub const DUCKDUCKGO_SEARCH: &str = "duckduckgo_search";
    pub const DUCKDUCKGO_NEWS: &str = "duckduckgo_news";

    pub const STOCK_PRICE: &str = "get_current_stock_price";
    pub const ANALYST_RECOMMENDATIONS: &str = "get_analyst_recommendations";
    pub const COMPANY_INFO: &str = "get_company_info";
    pub const COMPANY_NEWS: &str = "get_company_news";
    pub const STOCK_FUNDAMENTALS: &str = "get_stock_fundamentals";
    pub const HISTORICAL_PRICES: &str = "get_historical_stock_prices";

    pub const TRANSFER_PREFIX: &str = "transfer_task_to_";
}

// ─── Truncation limits ────────────────────────────────────────────────────────

pub mod limits {
    /// Max chars of a tool result echoed into debug logs
    pub const TOOL_LOG_PREVIEW: usize = 200;
    /// Max news items returned per company
    pub const COMPANY_NEWS_ITEMS: usize = 5;
}
