use finteam_core::tools::{FINANCIAL_LOOKUP, WEB_SEARCH};
use finteam_core::{
    AgentDescriptor, Capability, ConfigError, FinanceOptions, FinteamError, ModelProvider,
    ModelRef, ModelRegistry, SearchOptions, ToolBinding,
};

fn openai_only() -> ModelRegistry {
    ModelRegistry::new().with_provider(
        ModelProvider::OpenAI,
        finteam_core::llm::ProviderEndpoint::Http {
            api_key: Some("sk-test".into()),
            base_url: "http://127.0.0.1:9".into(),
        },
    )
}

fn config_err(result: Result<impl std::fmt::Debug, FinteamError>) -> ConfigError {
    match result {
        Err(FinteamError::Config(e)) => e,
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_web_agent_fields_round_trip() {
    let agent = AgentDescriptor::builder("Web Agent")
        .role("Search the web for information")
        .model(ModelRef::openai("gpt-4o"))
        .tool(ToolBinding::web_search())
        .instruction("Always include sources")
        .show_tool_calls(true)
        .markdown(true)
        .build(&openai_only())
        .unwrap();

    assert_eq!(agent.name(), "Web Agent");
    assert_eq!(agent.role(), "Search the web for information");
    assert_eq!(agent.model(), &ModelRef::openai("gpt-4o"));
    assert_eq!(agent.tools(), &[ToolBinding::web_search()]);
    assert_eq!(agent.instructions(), &["Always include sources".to_string()]);
    assert!(agent.show_tool_calls());
    assert!(agent.markdown());
    assert_eq!(agent.key(), "web_agent");
}

#[test]
fn test_builder_defaults() {
    let agent = AgentDescriptor::builder("Helper")
        .build(&openai_only())
        .unwrap();

    assert_eq!(agent.role(), "");
    assert_eq!(agent.model(), &ModelRef::default());
    assert!(agent.tools().is_empty());
    assert!(agent.instructions().is_empty());
    assert!(!agent.show_tool_calls());
    assert!(!agent.markdown());
}

#[test]
fn test_finance_binding_features() {
    let binding = ToolBinding::financial_lookup(FinanceOptions {
        stock_price: true,
        analyst_recommendations: true,
        company_info: true,
        ..FinanceOptions::none()
    });

    assert_eq!(binding.capability_name(), FINANCIAL_LOOKUP);
    let features: Vec<&str> = binding.enabled_features().iter().map(String::as_str).collect();
    assert_eq!(
        features,
        vec!["analyst_recommendations", "company_info", "stock_price"]
    );
}

#[test]
fn test_binding_by_name() {
    let binding = ToolBinding::new(WEB_SEARCH, ["news"]).unwrap();
    assert_eq!(
        binding.capability(),
        Capability::WebSearch(SearchOptions {
            search: false,
            news: true
        })
    );
    assert_eq!(binding.to_string(), "web_search(news)");
}

#[test]
fn test_unknown_capability_rejected() {
    let err = ToolBinding::new("image_generation", Vec::<String>::new()).unwrap_err();
    assert_eq!(err, ConfigError::UnknownCapability("image_generation".into()));
}

#[test]
fn test_unknown_feature_rejected() {
    let err = ToolBinding::new(FINANCIAL_LOOKUP, ["stock_price", "crypto_prices"]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownFeature {
            capability: FINANCIAL_LOOKUP.into(),
            feature: "crypto_prices".into(),
        }
    );
}

#[test]
fn test_empty_name_rejected() {
    let err = config_err(AgentDescriptor::builder("   ").build(&openai_only()));
    assert_eq!(err, ConfigError::EmptyName);
}

#[test]
fn test_unregistered_provider_rejected() {
    let result = AgentDescriptor::builder("Web Agent")
        .model(ModelRef::new(ModelProvider::Groq, "llama-3.3-70b-versatile"))
        .build(&openai_only());

    match config_err(result) {
        ConfigError::UnresolvedModel(model, reason) => {
            assert_eq!(model, "groq:llama-3.3-70b-versatile");
            assert!(reason.contains("GROQ_API_KEY"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_invalid_model_ref() {
    let err = "   ".parse::<ModelRef>().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidModelRef(_)));
}
