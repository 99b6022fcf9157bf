//! In-process stand-in for the extraction service, used by workflow tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{Backend, DeleteOutcome, DeleteStatus};
use crate::chat::ReplyStream;
use crate::errors::AppError;

type ExtractHook = Box<dyn Fn() + Send + Sync>;

/// Configurable [`Backend`] that records which endpoints were hit.
pub struct FakeBackend {
    pub extract_fields: Vec<(String, String)>,
    /// Runs during `extract`, before it returns. Lets a test interleave a
    /// competing store mutation while the upload is "in flight".
    pub extract_hook: Option<ExtractHook>,
    pub reply_chunks: Vec<&'static [u8]>,
    pub correction_reply: String,
    pub delete_outcome: DeleteOutcome,
    pub calls: Mutex<Vec<&'static str>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            extract_fields: Vec::new(),
            extract_hook: None,
            reply_chunks: Vec::new(),
            correction_reply: String::new(),
            delete_outcome: DeleteOutcome {
                status: DeleteStatus::Success,
                message: "Folder deleted successfully".to_string(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn record(&self, endpoint: &'static str) {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(endpoint);
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn extract(
        &self,
        _file_name: &str,
        _payload: Vec<u8>,
    ) -> Result<Vec<(String, String)>, AppError> {
        self.record("extract");
        if let Some(hook) = &self.extract_hook {
            hook();
        }
        Ok(self.extract_fields.clone())
    }

    async fn chat(
        &self,
        _document_ref: &str,
        _input_text: &str,
        _prior_messages: &[String],
    ) -> Result<ReplyStream, AppError> {
        self.record("chat");
        Ok(ReplyStream::new(futures::stream::iter(
            self.reply_chunks
                .iter()
                .map(|c| Ok(bytes::Bytes::from_static(c)))
                .collect::<Vec<Result<bytes::Bytes, reqwest::Error>>>(),
        )))
    }

    async fn assist_correction(
        &self,
        _document_ref: &str,
        _example_phrase: &str,
        _guiding_question: &str,
    ) -> Result<String, AppError> {
        self.record("assist_correction");
        Ok(self.correction_reply.clone())
    }

    async fn delete_artifact(&self, _document_ref: &str) -> Result<DeleteOutcome, AppError> {
        self.record("delete_artifact");
        Ok(self.delete_outcome.clone())
    }

    async fn trigger_evaluation(&self) -> Result<(), AppError> {
        self.record("trigger_evaluation");
        Ok(())
    }
}
