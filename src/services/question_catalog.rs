//! Underwriting question catalog client.
//!
//! Answers submitted on the `questions` step are checked against the questions
//! the catalog returns for the application's context (activity codes, industry,
//! zip codes, policy types, insurers).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::QuestionAnswerRow;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestionContext {
    pub activity_codes: Vec<i64>,
    pub industry_code: Option<i64>,
    pub zip_codes: Vec<String>,
    pub policy_types: Vec<String>,
    pub insurer_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionDefinition {
    pub id: i64,
    pub text: String,
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
}

#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    async fn get_questions_for_context(
        &self,
        context: &QuestionContext,
    ) -> AppResult<Vec<QuestionDefinition>>;
}

/// Keep only answers to catalog questions, annotated with the question's
/// text and type. Input order is preserved.
pub fn annotate_answers(
    answers: Vec<QuestionAnswerRow>,
    definitions: &[QuestionDefinition],
) -> Vec<QuestionAnswerRow> {
    answers
        .into_iter()
        .filter_map(|answer| {
            let definition = definitions.iter().find(|d| d.id == answer.question_id)?;
            Some(QuestionAnswerRow {
                question_text: Some(definition.text.clone()),
                question_type: definition
                    .question_type
                    .clone()
                    .or(answer.question_type),
                ..answer
            })
        })
        .collect()
}

/// Catalog over HTTP: `POST {base_url}/questions` with the context as JSON.
#[derive(Clone)]
pub struct HttpQuestionCatalog {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpQuestionCatalog {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Storage(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl QuestionCatalog for HttpQuestionCatalog {
    async fn get_questions_for_context(
        &self,
        context: &QuestionContext,
    ) -> AppResult<Vec<QuestionDefinition>> {
        let url = format!("{}/questions", self.base_url);
        self.http_client
            .post(&url)
            .json(context)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Storage(format!("Question catalog request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Invalid question catalog response: {}", e)))
    }
}
