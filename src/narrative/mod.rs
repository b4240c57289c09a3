//! Narrative report sections.
//!
//! Templates are always computed first. An optional rewriter may restyle
//! them; any key it fails to deliver keeps its template text.

pub mod rewriter;
pub mod templates;
pub mod tone;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::profile::UserHealthProfile;
use crate::rules::RuleOutput;

pub use rewriter::{NarrativeRewriter, OpenRouterRewriter, RewriteRequest};
pub use templates::{condition_template, template_narratives, template_section};

pub const SECTION_KEYS: [&str; 7] = [
    "profile_summary",
    "bmi_analysis",
    "sleep_analysis",
    "stress_analysis",
    "activity_guidance",
    "nutrition_overview",
    "closing_note",
];

const CONDITION_NOTES_KEY: &str = "condition_notes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub key: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Template,
    Rewritten,
    /// Some keys were rewritten, the rest fell back to templates.
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narratives {
    pub sections: Vec<NarrativeSection>,
    pub condition_notes: BTreeMap<String, String>,
    pub source: NarrativeSource,
}

impl Narratives {
    pub fn section(&self, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.text.as_str())
    }

    /// Every piece of free text, section bodies first.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .chain(self.condition_notes.values().map(String::as_str))
    }

    pub fn texts_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.sections
            .iter_mut()
            .map(|s| &mut s.text)
            .chain(self.condition_notes.values_mut())
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6 {
        let inner = &trimmed[3..trimmed.len() - 3];
        inner.trim_start_matches("json").trim()
    } else {
        trimmed
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Applies a raw rewriter response over the template narratives. Each key is
/// taken independently; anything missing, empty or non-string keeps its
/// template text and unknown keys are ignored.
pub fn merge_rewrite(template: Narratives, raw: &str) -> Narratives {
    let parsed: Value = match serde_json::from_str(strip_code_fences(raw)) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Narrative rewrite was not valid JSON, using templates");
            return template;
        }
    };
    let Some(object) = parsed.as_object() else {
        warn!("Narrative rewrite was not a JSON object, using templates");
        return template;
    };

    let mut merged = template;
    let mut replaced = 0usize;
    let mut expected = merged.sections.len();

    for section in merged.sections.iter_mut() {
        match non_empty_string(object.get(&section.key)) {
            Some(text) => {
                section.text = text;
                replaced += 1;
            }
            None => warn!(key = %section.key, "Rewrite missing section, keeping template"),
        }
    }

    let rewritten_notes = object.get(CONDITION_NOTES_KEY).and_then(Value::as_object);
    expected += merged.condition_notes.len();
    for (condition, text) in merged.condition_notes.iter_mut() {
        match non_empty_string(rewritten_notes.and_then(|notes| notes.get(condition))) {
            Some(rewritten) => {
                *text = rewritten;
                replaced += 1;
            }
            None => warn!(condition = %condition, "Rewrite missing condition note, keeping template"),
        }
    }

    merged.source = if replaced == 0 {
        NarrativeSource::Template
    } else if replaced == expected {
        NarrativeSource::Rewritten
    } else {
        NarrativeSource::Mixed
    };
    merged
}

/// Produces narratives, optionally restyled by an injected rewriter.
#[derive(Clone, Default)]
pub struct NarrativeComposer {
    rewriter: Option<Arc<dyn NarrativeRewriter>>,
}

impl NarrativeComposer {
    pub fn new(rewriter: Option<Arc<dyn NarrativeRewriter>>) -> Self {
        Self { rewriter }
    }

    pub fn templates_only() -> Self {
        Self { rewriter: None }
    }

    pub fn has_rewriter(&self) -> bool {
        self.rewriter.is_some()
    }

    pub async fn compose(&self, profile: &UserHealthProfile, rules: &RuleOutput) -> Narratives {
        let template = template_narratives(profile, rules);
        let Some(rewriter) = self.rewriter.as_ref() else {
            return template;
        };

        let request = RewriteRequest::new(profile, rules, &template);
        match rewriter.rewrite(&request).await {
            Ok(raw) => {
                let merged = merge_rewrite(template, &raw);
                info!(source = ?merged.source, "Narratives composed");
                merged
            }
            Err(e) => {
                warn!(error = %e, "Narrative rewriter failed, using templates");
                template
            }
        }
    }
}
