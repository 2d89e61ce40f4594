use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::fmt;

pub const WEB_SEARCH: &str = "web_search";
pub const FINANCIAL_LOOKUP: &str = "financial_lookup";

/// Which DuckDuckGo verticals a web-search binding exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub search: bool,
    pub news: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search: true,
            news: true,
        }
    }
}

impl SearchOptions {
    const FEATURES: [&'static str; 2] = ["search", "news"];

    fn flag_mut(&mut self, feature: &str) -> Option<&mut bool> {
        match feature {
            "search" => Some(&mut self.search),
            "news" => Some(&mut self.news),
            _ => None,
        }
    }

    fn enabled(&self) -> BTreeSet<String> {
        let flags = [self.search, self.news];
        Self::FEATURES
            .iter()
            .zip(flags)
            .filter(|(_, on)| *on)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// Which Yahoo Finance lookups a financial binding exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinanceOptions {
    pub stock_price: bool,
    pub analyst_recommendations: bool,
    pub company_info: bool,
    pub company_news: bool,
    pub stock_fundamentals: bool,
    pub historical_prices: bool,
}

impl Default for FinanceOptions {
    fn default() -> Self {
        Self {
            stock_price: true,
            analyst_recommendations: false,
            company_info: false,
            company_news: false,
            stock_fundamentals: false,
            historical_prices: false,
        }
    }
}

impl FinanceOptions {
    pub const FEATURES: [&'static str; 6] = [
        "stock_price",
        "analyst_recommendations",
        "company_info",
        "company_news",
        "stock_fundamentals",
        "historical_prices",
    ];

    pub fn none() -> Self {
        Self {
            stock_price: false,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            stock_price: true,
            analyst_recommendations: true,
            company_info: true,
            company_news: true,
            stock_fundamentals: true,
            historical_prices: true,
        }
    }

    fn flag_mut(&mut self, feature: &str) -> Option<&mut bool> {
        match feature {
            "stock_price" => Some(&mut self.stock_price),
            "analyst_recommendations" => Some(&mut self.analyst_recommendations),
            "company_info" => Some(&mut self.company_info),
            "company_news" => Some(&mut self.company_news),
            "stock_fundamentals" => Some(&mut self.stock_fundamentals),
            "historical_prices" => Some(&mut self.historical_prices),
            _ => None,
        }
    }

    fn flags(&self) -> [bool; 6] {
        [
            self.stock_price,
            self.analyst_recommendations,
            self.company_info,
            self.company_news,
            self.stock_fundamentals,
            self.historical_prices,
        ]
    }

    fn enabled(&self) -> BTreeSet<String> {
        Self::FEATURES
            .iter()
            .zip(self.flags())
            .filter(|(_, on)| *on)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// The closed set of external capabilities an agent can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    WebSearch(SearchOptions),
    FinancialLookup(FinanceOptions),
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WebSearch(_) => WEB_SEARCH,
            Self::FinancialLookup(_) => FINANCIAL_LOOKUP,
        }
    }

    /// Capability with its documented default features.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            WEB_SEARCH => Ok(Self::WebSearch(SearchOptions::default())),
            FINANCIAL_LOOKUP => Ok(Self::FinancialLookup(FinanceOptions::default())),
            other => Err(ConfigError::UnknownCapability(other.to_string())),
        }
    }

    fn with_features<'a>(
        name: &str,
        features: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let unknown = |feature: &str| ConfigError::UnknownFeature {
            capability: name.to_string(),
            feature: feature.to_string(),
        };

        match Self::from_name(name)? {
            Self::WebSearch(_) => {
                let mut options = SearchOptions {
                    search: false,
                    news: false,
                };
                for feature in features {
                    *options.flag_mut(feature).ok_or_else(|| unknown(feature))? = true;
                }
                Ok(Self::WebSearch(options))
            }
            Self::FinancialLookup(_) => {
                let mut options = FinanceOptions::none();
                for feature in features {
                    *options.flag_mut(feature).ok_or_else(|| unknown(feature))? = true;
                }
                Ok(Self::FinancialLookup(options))
            }
        }
    }

    pub fn enabled_features(&self) -> BTreeSet<String> {
        match self {
            Self::WebSearch(options) => options.enabled(),
            Self::FinancialLookup(options) => options.enabled(),
        }
    }

    /// Same capability with its default features if every flag is off.
    fn or_defaults(self) -> Self {
        match self {
            Self::WebSearch(options) if options.enabled().is_empty() => {
                Self::WebSearch(SearchOptions::default())
            }
            Self::FinancialLookup(options) if options.enabled().is_empty() => {
                Self::FinancialLookup(FinanceOptions::default())
            }
            other => other,
        }
    }
}

/// A validated reference to an external capability.
///
/// Construction fails fast on unknown capability or feature names; a
/// binding that exists is always one the executor can build tools for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolBinding {
    capability_name: String,
    enabled_features: BTreeSet<String>,
    capability: Capability,
}

impl ToolBinding {
    /// An empty feature list selects the capability's defaults.
    pub fn new<I, S>(capability_name: &str, features: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: Vec<S> = features.into_iter().collect();
        let capability = if requested.is_empty() {
            Capability::from_name(capability_name)?
        } else {
            Capability::with_features(capability_name, requested.iter().map(|f| f.as_ref()))?
        };
        Ok(Self::from_capability(capability))
    }

    /// An all-off option set selects the capability's defaults.
    pub fn from_capability(capability: Capability) -> Self {
        let capability = capability.or_defaults();
        Self {
            capability_name: capability.name().to_string(),
            enabled_features: capability.enabled_features(),
            capability,
        }
    }

    pub fn web_search() -> Self {
        Self::from_capability(Capability::WebSearch(SearchOptions::default()))
    }

    pub fn financial_lookup(options: FinanceOptions) -> Self {
        Self::from_capability(Capability::FinancialLookup(options))
    }

    pub fn capability_name(&self) -> &str {
        &self.capability_name
    }

    pub fn enabled_features(&self) -> &BTreeSet<String> {
        &self.enabled_features
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }
}

impl fmt::Display for ToolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features: Vec<&str> = self.enabled_features.iter().map(String::as_str).collect();
        write!(f, "{}({})", self.capability_name, features.join(", "))
    }
}
