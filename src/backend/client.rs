//! Backend API client.
//!
//! Encapsulates every interaction with the extraction service: document
//! upload/extract, the streaming chatbot, assisted corrections, vector-store
//! deletion, and the evaluation trigger. Request and response shapes follow
//! the service's wire contract; everything here is transport, the store is
//! never touched from this module.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::chat::ReplyStream;
use crate::errors::AppError;

/// Outcome reported by the delete endpoint. A `Failure` status arrives with
/// a 2xx response and must leave the caller's state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteOutcome {
    pub status: DeleteStatus,
    pub message: String,
}

/// Boundary to the extraction service. [`BackendClient`] is the HTTP
/// implementation; tests drive the workflows with in-process fakes.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Uploads a document and returns the extracted field mapping in the
    /// order the backend produced it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Extraction`] when extraction fails,
    /// [`AppError::Http`] when the request cannot be sent.
    async fn extract(
        &self,
        file_name: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<(String, String)>, AppError>;

    /// Opens one streaming chat exchange. `prior_messages` is the history so
    /// far, excluding the input being sent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ChatTransport`] when the exchange cannot be
    /// opened, [`AppError::Http`] when the request cannot be sent.
    async fn chat(
        &self,
        document_ref: &str,
        input_text: &str,
        prior_messages: &[String],
    ) -> Result<ReplyStream, AppError>;

    /// Asks the backend to propose a corrected value for a rejected field.
    /// An empty reply means the backend had nothing to offer and the caller
    /// must not mutate anything.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Assistant`] when the corrector fails,
    /// [`AppError::Http`] when the request cannot be sent.
    async fn assist_correction(
        &self,
        document_ref: &str,
        example_phrase: &str,
        guiding_question: &str,
    ) -> Result<String, AppError>;

    /// Deletes the backend-side artifact for a summary. The entity itself is
    /// only removed by the caller after a `Success` status comes back.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Deletion`] when the delete call fails,
    /// [`AppError::Http`] when the request cannot be sent.
    async fn delete_artifact(&self, document_ref: &str) -> Result<DeleteOutcome, AppError>;

    /// Kicks off the backend's extraction-quality evaluation run.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Evaluation`] when the run cannot be started,
    /// [`AppError::Http`] when the request cannot be sent.
    async fn trigger_evaluation(&self) -> Result<(), AppError>;
}

/// HTTP client for the extraction backend.
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    #[must_use]
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn extract(
        &self,
        file_name: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<(String, String)>, AppError> {
        info!("Uploading {file_name} for extraction ({} bytes)", payload.len());

        let part = Part::bytes(payload)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| AppError::Extraction(format!("Invalid upload part: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/get_resume"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Extraction(format!(
                "Extraction failed (status {status}): {body}"
            )));
        }

        let fields: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| AppError::Extraction(format!("Unreadable extraction response: {e}")))?;

        Ok(fields
            .into_iter()
            .map(|(key, value)| (key, stringify_field(value)))
            .collect())
    }

    async fn chat(
        &self,
        document_ref: &str,
        input_text: &str,
        prior_messages: &[String],
    ) -> Result<ReplyStream, AppError> {
        #[cfg(feature = "debug-logs")]
        info!("Sending chat input for {document_ref}: {input_text:?}");

        #[cfg(not(feature = "debug-logs"))]
        info!(
            "Sending chat input for {document_ref} with {} prior messages",
            prior_messages.len()
        );

        let body = json!({
            "vectorstore_name": document_ref,
            "input_text": input_text,
            "chat_history": prior_messages,
        });

        let response = self
            .http
            .post(self.url("/chatbot"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ChatTransport(format!(
                "Chat request failed (status {status}): {body}"
            )));
        }

        Ok(ReplyStream::new(response.bytes_stream()))
    }

    async fn assist_correction(
        &self,
        document_ref: &str,
        example_phrase: &str,
        guiding_question: &str,
    ) -> Result<String, AppError> {
        let body = json!({
            "vectorstore_name": document_ref,
            "input_prompt": example_phrase,
            "input_llm": guiding_question,
        });

        let response = self
            .http
            .post(self.url("/validator"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Assistant(format!(
                "Correction request failed (status {status}): {body}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Assistant(format!("Unreadable correction reply: {e}")))?;

        // The endpoint returns a JSON-ish quoted string.
        Ok(strip_surrounding_quotes(&text).to_string())
    }

    async fn delete_artifact(&self, document_ref: &str) -> Result<DeleteOutcome, AppError> {
        let body = json!({ "vectorstore_name": document_ref });

        let response = self
            .http
            .post(self.url("/delete-vectorstore"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Deletion(format!(
                "Deletion failed (status {status}): {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Deletion(format!("Unreadable deletion response: {e}")))
    }

    async fn trigger_evaluation(&self) -> Result<(), AppError> {
        let response = self.http.post(self.url("/get_evaluation")).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Evaluation(format!(
                "Evaluation failed (status {status}): {body}"
            )));
        }

        info!("Evaluation run triggered");
        Ok(())
    }
}

fn stringify_field(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn strip_surrounding_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}
