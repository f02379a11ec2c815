use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// One raw sensor sample, base64-encoded by the kiosk.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProbeSample {
    pub image: String,
}

/// Enrolled template forwarded to the match service. The template blob is
/// opaque to this service.
#[derive(Debug, Clone, Serialize)]
pub struct RosterTemplate {
    pub student_id: String,
    pub finger_type: String,
    pub template: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveOutcome {
    pub student_id: Option<String>,
    pub confidence: f32,
    pub finger_type: Option<String>,
}

#[derive(Debug, Display)]
pub enum ResolverError {
    #[display(fmt = "Identity resolver timed out")]
    Timeout,
    #[display(fmt = "Identity resolver request failed: {}", _0)]
    Transport(reqwest::Error),
}

/// External biometric match service. Confidence thresholding is the
/// orchestrator's responsibility, not the resolver's.
pub trait IdentityResolver {
    async fn identify(
        &self,
        probe: &ProbeSample,
        roster: &[RosterTemplate],
    ) -> Result<ResolveOutcome, ResolverError>;
}

#[derive(Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    identify_url: String,
}

impl HttpResolver {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build resolver HTTP client");

        Self {
            client,
            identify_url: format!("{}/identify/fingerprint/multi", base_url.trim_end_matches('/')),
        }
    }
}

impl IdentityResolver for HttpResolver {
    async fn identify(
        &self,
        probe: &ProbeSample,
        roster: &[RosterTemplate],
    ) -> Result<ResolveOutcome, ResolverError> {
        let response = self
            .client
            .post(&self.identify_url)
            .json(&json!({
                "image": probe.image,
                "fingerprints": roster,
            }))
            .send()
            .await
            .map_err(classify)?;

        let outcome = response
            .error_for_status()
            .map_err(classify)?
            .json::<ResolveOutcome>()
            .await
            .map_err(classify)?;

        Ok(outcome)
    }
}

fn classify(e: reqwest::Error) -> ResolverError {
    if e.is_timeout() {
        ResolverError::Timeout
    } else {
        ResolverError::Transport(e)
    }
}
