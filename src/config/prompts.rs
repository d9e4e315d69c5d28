//! Prompt templates for Svara.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix an answer derived from the retrieved context must carry.
pub const CONTEXT_MARKER: &str = "Based on the provided context:";

/// Prefix an answer derived from general knowledge must carry.
pub const GENERAL_MARKER: &str = "Based on general knowledge:";

/// The explicit statement used when the model cannot answer.
pub const UNKNOWN_ANSWER: &str = "I don't know.";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub contextualize: ContextualizePrompts,
    pub answer: AnswerPrompts,
    pub suggestions: SuggestionPrompts,
    pub eval: EvalPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompt for rewriting a follow-up question into a standalone one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextualizePrompts {
    pub system: String,
}

impl Default for ContextualizePrompts {
    fn default() -> Self {
        Self {
            system: "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question \
which can be understood without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is."
                .to_string(),
        }
    }
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: format!(
                r#"You are an expert assistant.
Answer using the provided context when possible.

- If answer is in the context: start with "{CONTEXT_MARKER} ..."
- If not in the context: use general knowledge, start with "{GENERAL_MARKER} ..."
- If unsure: say "{UNKNOWN_ANSWER}"
- Never invent facts. Be concise and clear.

CONTEXT:
{{{{context}}}}
"#
            ),
        }
    }
}

/// Prompt for generating suggested follow-up questions after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionPrompts {
    pub user: String,
}

impl Default for SuggestionPrompts {
    fn default() -> Self {
        Self {
            user: r#"Based on the following text, generate {{count}} concise, insightful questions a user might want to ask. The questions should be distinct. Number each question.

Text:
"""{{content}}"""

Questions:"#
                .to_string(),
        }
    }
}

/// Judge prompts for the offline evaluation harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalPrompts {
    pub faithfulness: String,
    pub answer_relevancy: String,
    pub context_precision: String,
    pub context_recall: String,
}

impl Default for EvalPrompts {
    fn default() -> Self {
        Self {
            faithfulness: r#"You are grading a question-answering system. Judge whether the answer is factually consistent with the retrieved context. Score 1.0 if every claim in the answer is supported by the context, 0.0 if none are, and a value in between otherwise.

Question: {{question}}

Context:
{{context}}

Answer: {{answer}}

Respond with a single number between 0.0 and 1.0 and nothing else."#
                .to_string(),
            answer_relevancy: r#"You are grading a question-answering system. Judge how directly the answer addresses the question, ignoring whether it is factually correct. Score 1.0 for a fully on-topic answer and 0.0 for an answer about something else entirely.

Question: {{question}}

Answer: {{answer}}

Respond with a single number between 0.0 and 1.0 and nothing else."#
                .to_string(),
            context_precision: r#"You are grading a retrieval system. Judge what fraction of the retrieved context passages are relevant to answering the question.

Question: {{question}}

Context passages:
{{context}}

Respond with a single number between 0.0 and 1.0 and nothing else."#
                .to_string(),
            context_recall: r#"You are grading a retrieval system. Judge whether the retrieved context contains the information needed to produce the reference answer. Score 1.0 if everything in the reference answer is covered by the context and 0.0 if nothing is.

Reference answer: {{ground_truth}}

Context passages:
{{context}}

Respond with a single number between 0.0 and 1.0 and nothing else."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let contextualize_path = custom_path.join("contextualize.toml");
            if contextualize_path.exists() {
                let content = std::fs::read_to_string(&contextualize_path)?;
                prompts.contextualize = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }

            let suggestions_path = custom_path.join("suggestions.toml");
            if suggestions_path.exists() {
                let content = std::fs::read_to_string(&suggestions_path)?;
                prompts.suggestions = toml::from_str(&content)?;
            }

            let eval_path = custom_path.join("eval.toml");
            if eval_path.exists() {
                let content = std::fs::read_to_string(&eval_path)?;
                prompts.eval = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
