//! 路由与响应归一化集成测试：通过公共 API + MockTransport 驱动完整链路

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use quill::config::AppConfig;
    use quill::core::{RuntimeConfigStore, RuntimeConfigUpdate};
    use quill::llm::{BackendKind, ChatMessage, JsonTransport, MockReply, MockTransport, ModelConfig};
    use quill::services::{
        EditRequest, GrammarCheckConfig, GrammarChecker, GrammarError, GrammarService, IssueType, Mode,
        RawGrammarMatch,
    };
    use quill::{AppError, Services, ServicesBuilder};
    use serde_json::json;
    use tempfile::TempDir;

    fn services(mock: Arc<MockTransport>) -> (TempDir, Services) {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.llm.runtime_config_path = dir.path().join("runtime_config.json");
        let services = ServicesBuilder::new(config)
            .with_transport(mock)
            .with_grammar(GrammarService::new(None, 5, 40))
            .build()
            .unwrap();
        (dir, services)
    }

    #[tokio::test]
    async fn test_analysis_keeps_only_verified_quotes() {
        let text = "The cat was being chased by the dog.";
        let mock = Arc::new(MockTransport::with_replies([json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "function": {
                        "name": "report_clarity_issues",
                        "arguments": {
                            "issues": [
                                {
                                    "quoted_text": "was being chased",
                                    "issue_type": "passive_voice",
                                    "suggestion": "Use active voice: the dog chased the cat.",
                                    "confidence": 0.9
                                },
                                {
                                    "quoted_text": "the mouse ran away",
                                    "issue_type": "wordiness",
                                    "suggestion": "Remove.",
                                    "confidence": 0.8
                                }
                            ]
                        }
                    }
                }]
            }
        })]));
        let (_dir, services) = services(mock.clone());

        let report = services.analysis.analyze(text).await.unwrap();

        assert_eq!(report.model, "llama3:instruct");
        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.offset(), 8);
        assert_eq!(issue.length(), 16);
        assert_eq!(&text[issue.span()], "was being chased");
        assert_eq!(issue.issue_type(), IssueType::PassiveVoice);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "report_clarity_issues");
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_tone_mode_without_tone_never_calls_model() {
        let mock = Arc::new(MockTransport::new());
        let (_dir, services) = services(mock.clone());

        let err = services
            .editing
            .edit(&EditRequest::new("Please fix this.", Mode::Tone))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.http_status(), 422);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_proofread_sends_one_precision_request() {
        let mock = Arc::new(MockTransport::with_replies([json!({
            "message": { "role": "assistant", "content": "  Their going home.\n" }
        })]));
        let (_dir, services) = services(mock.clone());

        let result = services
            .editing
            .edit(&EditRequest::new("Their going home", Mode::Proofread))
            .await
            .unwrap();

        assert_eq!(result.output_text, "Their going home.");
        assert_eq!(result.model.name, "llama3:instruct");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "http://10.8.14.169:11434/api/chat");
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["model"], "llama3:instruct");
        assert_eq!(body["options"]["temperature"], json!(0.1));
        assert_eq!(body["options"]["num_predict"], json!(512));
        assert!(body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_rewrite_routes_to_general_model_after_update() {
        let mock = Arc::new(MockTransport::with_replies([json!({
            "message": { "role": "assistant", "content": "Rewritten." }
        })]));
        let (_dir, services) = services(mock.clone());

        services
            .store
            .update(RuntimeConfigUpdate {
                base_url: Some("http://localhost:11434/".to_string()),
                general_model: Some("mistral:7b".to_string()),
                ..Default::default()
            })
            .unwrap();

        let result = services
            .editing
            .edit(&EditRequest::new("Some text.", Mode::Rewrite))
            .await
            .unwrap();

        assert_eq!(result.model.name, "mistral:7b");
        let requests = mock.requests();
        assert_eq!(requests[0].url, "http://localhost:11434/api/chat");
        assert_eq!(requests[0].body.as_ref().unwrap()["options"]["temperature"], json!(0.5));
    }

    #[tokio::test]
    async fn test_runtime_config_survives_rebuild() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runtime_config.json");
        {
            let store = RuntimeConfigStore::load(&path).unwrap();
            store
                .update(RuntimeConfigUpdate {
                    grammar_model: Some("phi3:mini".to_string()),
                    ..Default::default()
                })
                .unwrap();
        }

        let mut config = AppConfig::default();
        config.llm.runtime_config_path = path;
        let services = ServicesBuilder::new(config)
            .with_transport(Arc::new(MockTransport::new()))
            .build()
            .unwrap();

        let current = services.store.get();
        assert_eq!(current.grammar_model, "phi3:mini");
        assert_eq!(current.general_model, "qwen2:7b-instruct");
    }

    #[tokio::test]
    async fn test_openai_backend_round_trip() {
        let mock = Arc::new(MockTransport::with_replies([json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "lookup",
                            "arguments": "{\"term\": \"ownership\"}"
                        }
                    }]
                }
            }]
        })]));
        let (_dir, services) = services(mock.clone());

        let model = ModelConfig {
            name: "gpt-4o-mini".to_string(),
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            backend: BackendKind::OpenAi,
            temperature: 0.2,
            max_tokens: 256,
            top_p: 1.0,
        };
        let invocation = services
            .invoker
            .invoke_with(model, &[ChatMessage::user("Define ownership.")], &[])
            .await
            .unwrap();

        assert_eq!(invocation.result.content, "");
        assert_eq!(invocation.result.tool_calls.len(), 1);
        assert_eq!(invocation.result.tool_calls[0].name, "lookup");
        assert_eq!(invocation.result.tool_calls[0].arguments["term"], "ownership");

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["max_tokens"], json!(256));
        assert!(body.get("stream").is_none());
        assert!(body.get("options").is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_bad_gateway() {
        let mock = Arc::new(MockTransport::new());
        mock.push(MockReply::TransportError("connection refused".to_string()));
        let (_dir, services) = services(mock.clone());

        let err = services.analysis.analyze("A sentence.").await.unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(err.http_status(), 502);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_list_models_queries_tags_endpoint() {
        let mock = Arc::new(MockTransport::with_replies([json!({
            "models": [{ "name": "llama3:instruct" }, { "model": "qwen2:7b-instruct" }]
        })]));
        let (_dir, services) = services(mock.clone());

        let models = services.list_available_models().await.unwrap();

        assert_eq!(models, vec!["llama3:instruct", "qwen2:7b-instruct"]);
        let requests = mock.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "http://10.8.14.169:11434/api/tags");
    }

    struct FixedChecker;

    #[async_trait]
    impl GrammarChecker for FixedChecker {
        async fn check(&self, _text: &str) -> Result<Vec<RawGrammarMatch>, GrammarError> {
            Ok(vec![
                RawGrammarMatch {
                    message: "Possible typo".to_string(),
                    offset: 0,
                    length: 5,
                    replacements: vec!["There".to_string()],
                    rule_id: "CONFUSION_RULE".to_string(),
                    category: "GRAMMAR".to_string(),
                    sentence: None,
                },
                RawGrammarMatch {
                    message: "Consider a comma".to_string(),
                    offset: 6,
                    length: 2,
                    replacements: vec![],
                    rule_id: "COMMA".to_string(),
                    category: "TYPOGRAPHY".to_string(),
                    sentence: None,
                },
            ])
        }
    }

    #[tokio::test]
    async fn test_grammar_check_through_services() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.llm.runtime_config_path = dir.path().join("runtime_config.json");
        let mock = Arc::new(MockTransport::new());
        let services = ServicesBuilder::new(config)
            .with_transport(mock.clone() as Arc<dyn JsonTransport>)
            .with_grammar(GrammarService::new(Some(Arc::new(FixedChecker)), 5, 40))
            .build()
            .unwrap();

        let rules = GrammarCheckConfig {
            disabled_categories: vec!["typography".to_string()],
        };
        let response = services.grammar.check("Their is a cat.", Some(&rules)).await;

        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].rule_id, "CONFUSION_RULE");
        assert_eq!(mock.call_count(), 0);
    }
}
