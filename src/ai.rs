//! Natural-language questions about the current table.
//!
//! The model only ever sees a [`TableSummary`] rendered to text, never the
//! table itself. [`TextGenerator`] is the seam to the external service so the
//! rest of the crate (and the tests) can run without network access.

pub mod client;

pub use client::AIAssistant;

use crate::error::{Result, TableTalkError};
use crate::table::TableSummary;
use async_trait::async_trait;

/// Single-shot text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Full prompt: assistant instructions, the table summary and the question.
pub fn build_prompt(summary: &TableSummary, question: &str) -> String {
    format!(
        "You are a professional data analysis assistant analyzing a tabular dataset.\n\
         \n\
         {summary}\n\
         \n\
         User question: {question}\n\
         \n\
         Answer using only the information above. Quote specific numbers where they \
         support the answer. Be concise and structure longer answers with short \
         sections or bullet points. If the question cannot be answered from this \
         summary, say so and explain what additional data would be needed.",
        summary = summary.render(),
        question = question.trim(),
    )
}

/// Ask `question` about the table described by `summary`.
///
/// # Errors
///
/// An empty question is rejected before any call is made; service failures and
/// empty answers become [`TableTalkError::ExternalService`].
pub async fn ask(
    generator: &dyn TextGenerator,
    summary: &TableSummary,
    question: &str,
) -> Result<String> {
    if question.trim().is_empty() {
        return Err(TableTalkError::Other("Please enter a question".to_owned()));
    }

    let prompt = build_prompt(summary, question);
    tracing::debug!(prompt_chars = prompt.len(), "Sending question");

    let answer = generator.generate(&prompt).await?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(TableTalkError::ExternalService(
            "The service returned an empty answer".to_owned(),
        ));
    }
    Ok(answer.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::summarize;
    use polars::prelude::*;
    use std::sync::Mutex;

    struct Recording {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for Recording {
        async fn generate(&self, prompt: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_owned());
            }
            Ok(self.reply.clone())
        }
    }

    fn summary() -> TableSummary {
        let df = df!("price" => &[1.0, 2.0, 3.0]).expect("frame");
        summarize(&df, 5).expect("summary")
    }

    #[test]
    fn test_prompt_contains_summary_and_question() {
        let prompt = build_prompt(&summary(), "  What is the average price?  ");
        assert!(prompt.contains("professional data analysis assistant"));
        assert!(prompt.contains("- Shape: (3, 1)"));
        assert!(prompt.contains("User question: What is the average price?\n"));
    }

    #[tokio::test]
    async fn test_ask_trims_answer() {
        let generator = Recording {
            reply: "  The average price is 2.  \n".to_owned(),
            prompts: Mutex::new(Vec::new()),
        };
        let answer = ask(&generator, &summary(), "Average price?")
            .await
            .expect("answer");
        assert_eq!(answer, "The average price is 2.");
        assert_eq!(generator.prompts.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn test_empty_question_and_answer() {
        let generator = Recording {
            reply: "   ".to_owned(),
            prompts: Mutex::new(Vec::new()),
        };
        assert!(ask(&generator, &summary(), " ").await.is_err());
        assert!(generator.prompts.lock().expect("lock").is_empty());

        let err = ask(&generator, &summary(), "Anything?").await.unwrap_err();
        assert!(matches!(err, TableTalkError::ExternalService(_)));
    }
}
