//! Remote simulate endpoint: wire types and the HTTP client.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::error::SweepError;

pub const DEFAULT_ENDPOINT: &str = "https://quantum-communication-simulator.onrender.com/simulate";
pub const DEFAULT_QUBITS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub qubits: u32,
    pub distance: f64,
    pub repeaters: u32,
    pub eve: bool,
}

/// Authoritative result for one run. Every field is required on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub qber: f64,
    pub fidelity: f64,
    pub final_key_length: u64,
    pub eve_detected: bool,
    pub secure: bool,
    pub key_rate: f64,
    pub channel_loss: f64,
}

/// Anything that can answer a simulate request.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult, SweepError>;
}

/// Map an HTTP status and body onto the sweep error taxonomy.
pub fn decode_response(status: u16, body: &str) -> Result<SimulationResult, SweepError> {
    if !(200..300).contains(&status) {
        let snippet: String = body.chars().take(200).collect();
        return Err(SweepError::network(format!("http status {status}: {snippet}")));
    }
    let result: SimulationResult = serde_json::from_str(body)
        .map_err(|e| SweepError::protocol(format!("malformed simulate response: {e}")))?;
    if !result.qber.is_finite() || !(0.0..=1.0).contains(&result.qber) {
        return Err(SweepError::protocol(format!("qber {} outside [0, 1]", result.qber)));
    }
    Ok(result)
}

pub struct RemoteSimulator {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteSimulator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SweepError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SweepError::configuration(format!("http client: {e}")))?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

#[async_trait]
impl SimulationBackend for RemoteSimulator {
    fn name(&self) -> &'static str { "remote" }

    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult, SweepError> {
        debug!(endpoint = %self.endpoint, ?request, "simulate");
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "simulate request failed");
                if e.is_timeout() {
                    SweepError::network(format!("request timed out: {e}"))
                } else {
                    SweepError::network(e.to_string())
                }
            })?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| SweepError::network(format!("reading body: {e}")))?;
        decode_response(status, &body)
    }
}
