//! In-memory transport for unit tests.
#![allow(clippy::unwrap_used)]

use crate::body::FormData;
use crate::error::FetchError;
use crate::headers::Headers;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum MockPayload {
    Json(Value),
    Form(FormData),
    Text(String),
}

/// Canned response; body readers hand back the payload as stored
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub payload: MockPayload,
}

impl MockResponse {
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            payload: MockPayload::Text(body.to_owned()),
        }
    }

    pub fn json(status: u16, content_type: &str, body: Value) -> Self {
        Self {
            payload: MockPayload::Json(body),
            ..Self::text(status, "")
        }
        .with_header("content-type", content_type)
    }

    pub fn form(status: u16, content_type: &str, form: FormData) -> Self {
        Self {
            payload: MockPayload::Form(form),
            ..Self::text(status, "")
        }
        .with_header("content-type", content_type)
    }

    pub fn with_status_text(mut self, status_text: &str) -> Self {
        status_text.clone_into(&mut self.status_text);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value).unwrap();
        self
    }
}

#[async_trait]
impl TransportResponse for MockResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    async fn json(self) -> Result<Value, FetchError> {
        match self.payload {
            MockPayload::Json(value) => Ok(value),
            MockPayload::Text(text) => Ok(serde_json::from_str(&text)?),
            MockPayload::Form(_) => Err(FetchError::InvalidFormData("not json".to_owned())),
        }
    }

    async fn form_data(self) -> Result<FormData, FetchError> {
        match self.payload {
            MockPayload::Form(form) => Ok(form),
            _ => Err(FetchError::InvalidFormData("not a form".to_owned())),
        }
    }

    async fn text(self) -> Result<String, FetchError> {
        match self.payload {
            MockPayload::Text(text) => Ok(text),
            MockPayload::Json(value) => Ok(value.to_string()),
            MockPayload::Form(form) => Ok(form.to_string()),
        }
    }
}

/// Records every call and answers with the same canned outcome
pub struct MockTransport {
    outcome: Result<MockResponse, String>,
    calls: Mutex<Vec<(String, TransportRequest)>>,
}

impl MockTransport {
    pub fn new(response: MockResponse) -> Self {
        Self {
            outcome: Ok(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_owned()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, TransportRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Response = MockResponse;

    async fn fetch(
        &self,
        path: &str,
        request: TransportRequest,
    ) -> Result<MockResponse, FetchError> {
        self.calls.lock().unwrap().push((path.to_owned(), request));
        match &self.outcome {
            Ok(response) => Ok(response.clone()),
            Err(message) => Err(FetchError::Transport(message.clone().into())),
        }
    }
}
