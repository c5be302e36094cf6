use super::geocode::{normalize_zip, Geocoder, Location};
use super::prediction::{
    ChartSeries, FactorExplanation, HistoricalContext, PredictionOutcome, PredictionRequest,
    PredictionService,
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Everything known about one ZIP, date and time.
///
/// The prediction is required; the chart, explanation and history panels are
/// optional and their failures end up in `warnings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub location: Location,
    pub prediction: PredictionOutcome,
    pub chart: Option<ChartSeries>,
    pub explanation: Option<FactorExplanation>,
    pub history: Option<HistoricalContext>,
    pub warnings: Vec<String>,
}

impl RiskReport {
    /// Geocodes the request's ZIP, then builds the report for it
    pub async fn gather(
        geocoder: &dyn Geocoder,
        predictor: &dyn PredictionService,
        request: &PredictionRequest,
    ) -> Result<Self> {
        let not_found = || MapError::InvalidCoordinates("ZIP code not found".to_string());
        let zip = normalize_zip(&request.zip_code).ok_or_else(not_found)?;
        let location = geocoder.lookup(&zip).await.ok_or_else(not_found)?;
        Self::gather_for(location, predictor, request).await
    }

    /// Builds the report for an already resolved location; the request is
    /// sent with the location's ZIP
    pub async fn gather_for(
        location: Location,
        predictor: &dyn PredictionService,
        request: &PredictionRequest,
    ) -> Result<Self> {
        let request = PredictionRequest {
            zip_code: location.zip_code.clone(),
            ..request.clone()
        };
        let prediction = predictor.predict(&request).await?;

        let (chart, explanation, history) = futures::join!(
            predictor.chart_data(&request),
            predictor.explain(&request),
            predictor.historical_context(&request),
        );

        let mut warnings = Vec::new();
        let chart = absorb("chart data", chart, &mut warnings);
        let explanation = absorb("factor explanation", explanation, &mut warnings);
        let history = absorb("historical context", history, &mut warnings);

        Ok(Self {
            location,
            prediction,
            chart,
            explanation,
            history,
            warnings,
        })
    }

    /// Multi-line text for a terminal
    pub fn summary(&self) -> String {
        let location = &self.location;
        let prediction = &self.prediction.prediction;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "{}, {} {} ({:.4}, {:.4})",
            location.city, location.state, location.zip_code, location.latitude, location.longitude
        );
        let _ = writeln!(
            out,
            "{} {}: {} risk (rate {:.2}, confidence {:.0}%)",
            self.prediction.input.date,
            self.prediction.input.time,
            prediction.category(),
            prediction.crime_rate,
            prediction.confidence * 100.0
        );
        if !prediction.message.is_empty() {
            let _ = writeln!(out, "{}", prediction.message);
        }
        if let Some(error) = &prediction.error {
            let _ = writeln!(out, "Model error: {}", error);
        }

        let factors = prediction.factor_labels();
        if !factors.is_empty() {
            let _ = writeln!(out, "Factors: {}", factors.join(", "));
        }

        let panels: Vec<&str> = [
            ("chart", self.chart.is_some()),
            ("explanation", self.explanation.is_some()),
            ("history", self.history.is_some()),
        ]
        .iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| *name)
        .collect();
        if !panels.is_empty() {
            let _ = writeln!(out, "Panels: {}", panels.join(", "));
        }

        for warning in &self.warnings {
            let _ = writeln!(out, "Warning: {}", warning);
        }
        out
    }
}

fn absorb<T>(what: &str, result: Result<T>, warnings: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{} unavailable: {}", what, e);
            warnings.push(format!("{} unavailable: {}", what, e));
            None
        }
    }
}
