//! Assistant bridge: composes a schema-aware prompt and hands it to a
//! language-model service that answers with SQL text.
//!
//! The bridge never executes what comes back. Running a suggestion is a
//! separate, explicit action through the query runner. No retry, and no
//! validation of the returned SQL.

use crate::config::AssistantConfig;
use crate::db::TableDescription;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::info;

/// One schema sentence for a loaded table, e.g.
/// `One of the tables is called 'iris' and has following fields: sepal_length (DOUBLE), variety (VARCHAR)`.
pub fn table_sentence(description: &TableDescription) -> String {
    let fields = description
        .columns
        .iter()
        .map(|(name, dtype)| format!("{name} ({dtype})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "One of the tables is called '{}' and has following fields: {}",
        description.name, fields
    )
}

/// Compose the single prompt sent to the service: the SQL-only instruction,
/// one schema sentence per loaded table, then the question.
pub fn compose_prompt(question: &str, schema_sentences: &[String]) -> String {
    let mut prompt = String::from(
        "You write SQL for an analytical database. \
         Answer with a single SQL query only, no explanation and no markdown.\n",
    );
    for sentence in schema_sentences {
        prompt.push_str(sentence);
        prompt.push('\n');
    }
    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt
}

/// Boundary to the text-in/text-out suggestion service.
pub trait SqlSuggester {
    /// Returns text purported to be a SQL query. Unexecuted and unvalidated.
    fn suggest(&self, question: &str, schema_sentences: &[String]) -> Result<String>;
}

/// Suggester backed by an OpenAI-compatible chat-completions endpoint.
pub struct HttpSuggester {
    config: AssistantConfig,
}

impl HttpSuggester {
    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }
}

impl SqlSuggester for HttpSuggester {
    fn suggest(&self, question: &str, schema_sentences: &[String]) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| eyre!("No assistant API key configured"))?;
        let prompt = compose_prompt(question, schema_sentences);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        info!(endpoint = %self.config.endpoint, "requesting SQL suggestion");
        let response = ureq::post(&self.config.endpoint)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| eyre!("Assistant request failed: {e}"))?;
        let payload: serde_json::Value = serde_json::from_str(&response.into_string()?)?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| eyre!("Assistant response had no content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iris_description() -> TableDescription {
        TableDescription {
            name: "iris".to_string(),
            columns: vec![
                ("sepal_length".to_string(), "DOUBLE".to_string()),
                ("variety".to_string(), "VARCHAR".to_string()),
            ],
        }
    }

    #[test]
    fn sentence_lists_fields_in_order() {
        assert_eq!(
            table_sentence(&iris_description()),
            "One of the tables is called 'iris' and has following fields: \
             sepal_length (DOUBLE), variety (VARCHAR)"
        );
    }

    #[test]
    fn prompt_contains_instruction_schemas_and_question() {
        let sentences = vec![table_sentence(&iris_description())];
        let prompt = compose_prompt("average sepal length by variety", &sentences);
        assert!(prompt.contains("SQL query only"));
        assert!(prompt.contains("'iris'"));
        assert!(prompt.ends_with("Question: average sepal length by variety"));
    }

    #[test]
    fn suggester_without_api_key_is_an_error() {
        let suggester = HttpSuggester::new(AssistantConfig::default());
        let err = suggester.suggest("anything", &[]).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
