//! HTTP submission client
//!
//! reqwest implementation of [`RegistryClient`]. The client carries
//! request and connect timeouts and refuses redirects, which would turn
//! the POSTs into GETs on some proxies.

use super::types::{
    field_errors_from_body, DetectionAccepted, RegisterEventRequest, RegistrationOutcome,
    SubmitDetectionRequest, SubmissionOutcome,
};
use super::RegistryClient;
use crate::models::{DecodedResult, EventContext};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for the remote registry
#[derive(Clone)]
pub struct SubmissionClient {
    http: Client,
    base_url: String,
    client_info: String,
}

impl SubmissionClient {
    pub fn new(base_url: impl Into<String>, client_info: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_info: client_info.into(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/api/events", self.base_url)
    }

    fn barcodes_url(&self) -> String {
        format!("{}/api/barcodes", self.base_url)
    }
}

/// Classify a detection response from status and body
///
/// Pure so the mapping is testable without a live registry.
pub fn classify_detection_response(status: StatusCode, body: &str) -> SubmissionOutcome {
    if status.is_success() {
        match serde_json::from_str::<DetectionAccepted>(body) {
            Ok(accepted) => SubmissionOutcome::Accepted { id: accepted.id },
            Err(_) => {
                // 2xx with an unparseable body still means stored; keep
                // the outcome but without an id
                SubmissionOutcome::Accepted { id: String::new() }
            }
        }
    } else if status == StatusCode::BAD_REQUEST {
        SubmissionOutcome::ValidationFailed {
            field_errors: field_errors_from_body(body),
        }
    } else {
        SubmissionOutcome::TransportFailed {
            status: status.as_u16(),
        }
    }
}

/// Classify a registration response from status and body
pub fn classify_registration_response(status: StatusCode, body: &str) -> RegistrationOutcome {
    if status.is_success() {
        RegistrationOutcome::Registered
    } else if status == StatusCode::BAD_REQUEST {
        RegistrationOutcome::ValidationFailed {
            field_errors: field_errors_from_body(body),
        }
    } else {
        RegistrationOutcome::TransportFailed {
            status: status.as_u16(),
        }
    }
}

#[async_trait]
impl RegistryClient for SubmissionClient {
    async fn register_event(&self, context: &EventContext) -> RegistrationOutcome {
        let payload = RegisterEventRequest {
            event: context.label().to_string(),
            date: context.date().to_string(),
        };

        debug!(url = %self.events_url(), event = %payload.event, "Registering event");

        let response = match self.http.post(self.events_url()).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Event registration request failed");
                return RegistrationOutcome::ConnectionFailed;
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let outcome = classify_registration_response(status, &body);

        match &outcome {
            RegistrationOutcome::Registered => {
                info!(event = %payload.event, date = %payload.date, "Event registered");
            }
            other => {
                warn!(status = %status, outcome = ?other, "Event registration rejected");
            }
        }

        outcome
    }

    async fn submit_detection(
        &self,
        result: &DecodedResult,
        context: &EventContext,
    ) -> SubmissionOutcome {
        let payload = SubmitDetectionRequest {
            code: result.display_value.clone(),
            format: result.symbology_label.clone(),
            event: context.label().to_string(),
            date: context.date().to_string(),
            client_info: self.client_info.clone(),
        };

        let response = match self
            .http
            .post(self.barcodes_url())
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Detection submission request failed");
                return SubmissionOutcome::ConnectionFailed;
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let outcome = classify_detection_response(status, &body);

        match &outcome {
            SubmissionOutcome::Accepted { id } => {
                info!(code = %payload.code, id = %id, "Detection stored");
            }
            other => {
                warn!(status = %status, outcome = ?other, "Detection submission rejected");
            }
        }

        outcome
    }
}
