use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::api_connection::endpoints::{ChatCompletionRequest, ChatMessage, Provider, ResponseFormat};
use crate::profile::UserHealthProfile;
use crate::rules::RuleOutput;

use super::Narratives;

/// External text-generation capability. Implementations return the raw
/// model output; parsing and per-key fallback happen in the composer.
#[async_trait]
pub trait NarrativeRewriter: Send + Sync {
    async fn rewrite(&self, request: &RewriteRequest) -> anyhow::Result<String>;
}

/// What the rewriter is allowed to see: a summary, the pre-computed facts
/// and the template text it should restyle.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteRequest {
    pub profile_summary: String,
    pub facts: Vec<String>,
    pub sections: BTreeMap<String, String>,
    pub condition_notes: BTreeMap<String, String>,
}

impl RewriteRequest {
    pub fn new(profile: &UserHealthProfile, rules: &RuleOutput, template: &Narratives) -> Self {
        let targets = profile.macro_targets;
        let facts = vec![
            format!("Age {}, BMI {:.1}", profile.age, profile.bmi),
            format!("Daily calorie target {:.0} kcal", profile.calorie_target),
            format!(
                "Protein {:.0}g, carbohydrate {:.0}g, fat {:.0}g",
                targets.protein_g, targets.carbs_g, targets.fat_g
            ),
            format!("Sleep score {}/100 ({})", profile.scores.sleep, rules.severity.sleep.label()),
            format!("Stress score {}/100 ({})", profile.scores.stress, rules.severity.stress.label()),
            format!("Activity score {}/100", profile.scores.activity),
        ];
        Self {
            profile_summary: format!("{} ({} years, {} diet)", profile.display_name(), profile.age, profile.diet_preference),
            facts,
            sections: template
                .sections
                .iter()
                .map(|s| (s.key.clone(), s.text.clone()))
                .collect(),
            condition_notes: template.condition_notes.clone(),
        }
    }
}

const SYSTEM_PROMPT: &str = "/no_thinking
You are a health report copy editor. Rewrite each text you are given so it reads warmly and clearly.
Rules:
- Return ONLY a JSON object, no markdown and no commentary.
- Use exactly the same keys as the 'sections' object you receive, each with a string value.
- Add a key 'condition_notes' holding an object with exactly the same keys as the 'condition_notes' you receive.
- Never add facts, numbers, diagnoses or recommendations that are not in the input.
- Keep the tone of each text: do not make worrying results sound good or good results sound worrying.";

/// Rewriter backed by the OpenRouter chat-completion endpoint.
pub struct OpenRouterRewriter {
    provider: Provider,
    model: String,
}

impl OpenRouterRewriter {
    pub fn new(api_key_env_var: &str, model: impl Into<String>) -> Self {
        Self {
            provider: Provider::openrouter(api_key_env_var),
            model: model.into(),
        }
    }

    /// False when the API key variable is unset, in which case every call
    /// would fail and callers should not wire the rewriter in at all.
    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }
}

#[async_trait]
impl NarrativeRewriter for OpenRouterRewriter {
    async fn rewrite(&self, request: &RewriteRequest) -> anyhow::Result<String> {
        let user_content = serde_json::to_string_pretty(request)?;
        let chat_request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content,
                },
            ],
            response_format: Some(ResponseFormat::json_object()),
            temperature: Some(0.3),
            max_tokens: Some(2048),
        };

        let response = self.provider.call_chat_completion(chat_request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Rewriter returned no choices"))?;
        if content.trim().is_empty() {
            return Err(anyhow::anyhow!("Rewriter returned empty content"));
        }
        tracing::debug!(chars = content.len(), "Received narrative rewrite");
        Ok(content)
    }
}
