//! Clients for the HTTP services around the map: ZIP geocoding and the risk
//! prediction backend, plus the report that combines them.

pub mod cities;
pub mod geocode;
pub mod prediction;
pub mod report;

pub use cities::{distinct_cities, merge_city_lists, CityEntry};
pub use geocode::{normalize_zip, Geocoder, Location, ZippopotamGeocoder};
pub use prediction::{
    ApiEnvelope, ChartSeries, FactorExplanation, HealthStatus, HistoricalContext,
    HttpPredictionService, Prediction, PredictionOutcome, PredictionRequest, PredictionService,
    RiskCategory,
};
pub use report::RiskReport;
