//! Client for the risk prediction backend
//!
//! `POST /api/predict` returns the full prediction; the auxiliary endpoints
//! wrap their payload in a `{success, data|error}` envelope. A `false`
//! envelope or an error status becomes [`MapError::Upstream`].

use crate::core::config::ApiConfig;
use crate::core::constants::{GOOD_PREDICTION_CONFIDENCE, USER_AGENT};
use crate::{MapError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// Buckets a crime probability: below 0.33 Low, below 0.66 Medium
    pub fn from_rate(rate: f64) -> Self {
        if rate < 0.33 {
            Self::Low
        } else if rate < 0.66 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body sent to every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub zip_code: String,
}

impl PredictionRequest {
    pub fn new(date: impl Into<String>, time: impl Into<String>, zip_code: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            zip_code: zip_code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub crime_rate: f64,
    #[serde(rename = "crime_category", default)]
    pub category: Option<RiskCategory>,
    #[serde(default)]
    pub confidence: f64,
    /// Contributing factors, as plain labels or objects
    #[serde(default)]
    pub factors: Vec<serde_json::Value>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_good_prediction: bool,
    #[serde(default)]
    pub has_enough_history: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub raw_output: Option<f64>,
}

impl Prediction {
    /// Builds the prediction the backend would report for probability `rate`
    pub fn from_rate(rate: f64) -> Self {
        let confidence = rate.max(1.0 - rate);
        let good = confidence >= GOOD_PREDICTION_CONFIDENCE;
        let message = match (good, rate >= 0.5) {
            (true, true) => "Model is confident: higher risk period based on historical data.",
            (true, false) => "Model is confident: lower risk period based on historical data.",
            (false, _) => {
                "Model is uncertain here; not enough historical data for a strong prediction."
            }
        };

        Self {
            crime_rate: rate,
            category: Some(RiskCategory::from_rate(rate)),
            confidence,
            factors: Vec::new(),
            message: message.to_string(),
            is_good_prediction: good,
            has_enough_history: good,
            error: None,
            raw_output: Some(rate),
        }
    }

    /// Reported category, or one bucketed from the rate when absent
    pub fn category(&self) -> RiskCategory {
        self.category
            .unwrap_or_else(|| RiskCategory::from_rate(self.crime_rate))
    }

    pub fn is_confident(&self) -> bool {
        self.confidence >= GOOD_PREDICTION_CONFIDENCE
    }

    /// Human-readable factor names
    pub fn factor_labels(&self) -> Vec<String> {
        self.factors
            .iter()
            .filter_map(|factor| match factor {
                serde_json::Value::String(label) => Some(label.clone()),
                serde_json::Value::Object(fields) => ["name", "factor", "label"]
                    .iter()
                    .find_map(|key| fields.get(*key).and_then(|v| v.as_str()))
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

/// Successful `/api/predict` answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub input: PredictionRequest,
    /// Feature values the model saw, keyed by name
    pub features: serde_json::Value,
    pub feature_vector: Vec<f64>,
    pub prediction: Prediction,
    pub timestamp: Option<String>,
}

#[derive(Deserialize)]
struct PredictResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    input: Option<PredictionRequest>,
    #[serde(default)]
    features: serde_json::Value,
    #[serde(default)]
    feature_vector: Vec<f64>,
    #[serde(default)]
    prediction: Option<Prediction>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl PredictResponse {
    fn into_outcome(self, request: &PredictionRequest) -> Result<PredictionOutcome> {
        if !self.success {
            return Err(MapError::Upstream(
                self.error.unwrap_or_else(|| "prediction failed".to_string()),
            ));
        }
        let prediction = self
            .prediction
            .ok_or_else(|| MapError::Upstream("response without prediction".to_string()))?;

        Ok(PredictionOutcome {
            input: self.input.unwrap_or_else(|| request.clone()),
            features: self.features,
            feature_vector: self.feature_vector,
            prediction,
            timestamp: self.timestamp,
        })
    }
}

/// `{success, data|error}` wrapper used by the auxiliary endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_result(self, endpoint: &str) -> Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(MapError::Upstream(format!("{} returned no data", endpoint))),
            (false, _) => Err(MapError::Upstream(
                self.error
                    .unwrap_or_else(|| format!("{} failed", endpoint)),
            )),
        }
    }
}

/// Time series for the trend chart; the schema belongs to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartSeries(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorExplanation(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalContext(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionOutcome>;

    async fn chart_data(&self, request: &PredictionRequest) -> Result<ChartSeries>;

    async fn explain(&self, request: &PredictionRequest) -> Result<FactorExplanation>;

    async fn historical_context(&self, request: &PredictionRequest) -> Result<HistoricalContext>;

    async fn health(&self) -> Result<HealthStatus>;
}

pub struct HttpPredictionService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPredictionService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: crate::tiles::loader::HTTP_CLIENT.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.prediction_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends `request` and decodes the body even on an error status, since
    /// the backend explains failures in JSON
    async fn post<R: DeserializeOwned>(&self, path: &str, request: &PredictionRequest) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("POST {} for {} {} {}", url, request.date, request.time, request.zip_code);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<R>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => {
                Err(MapError::Upstream(format!("HTTP {} from {}", status, path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn post_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        request: &PredictionRequest,
    ) -> Result<T> {
        let envelope: ApiEnvelope<T> = self.post(path, request).await?;
        envelope.into_result(path)
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionOutcome> {
        let response: PredictResponse = self.post("/api/predict", request).await?;
        let outcome = response.into_outcome(request)?;
        log::info!(
            "prediction for {}: {} (rate {:.3}, confidence {:.3})",
            request.zip_code,
            outcome.prediction.category(),
            outcome.prediction.crime_rate,
            outcome.prediction.confidence
        );
        Ok(outcome)
    }

    async fn chart_data(&self, request: &PredictionRequest) -> Result<ChartSeries> {
        self.post_envelope("/api/chart-data", request).await
    }

    async fn explain(&self, request: &PredictionRequest) -> Result<FactorExplanation> {
        self.post_envelope("/api/explain", request).await
    }

    async fn historical_context(&self, request: &PredictionRequest) -> Result<HistoricalContext> {
        self.post_envelope("/api/historical-context", request).await
    }

    async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/api/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Upstream(format!(
                "HTTP {} from /api/health",
                response.status()
            )));
        }
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }
}
