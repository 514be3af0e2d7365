use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body sent to the prediction service: the caller's payload as the only instance.
#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub instances: [&'a Value; 1],
}

impl<'a> PredictRequest<'a> {
    pub fn wrap(instance: &'a Value) -> Self {
        PredictRequest {
            instances: [instance],
        }
    }
}

/// Only `predictions[0]` is read; the entries are left untyped so a malformed
/// trailing entry cannot fail the whole response.
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub value: Value,
    pub lower_bound: Value,
    pub upper_bound: Value,
}

impl PredictResponse {
    /// Takes the first prediction. Missing fields, a non-object entry or an
    /// empty list all yield null fields.
    pub fn into_result(self) -> PredictionResult {
        let first = self.predictions.into_iter().next().unwrap_or_default();
        let field = |name: &str| first.get(name).cloned().unwrap_or(Value::Null);
        PredictionResult {
            value: field("value"),
            lower_bound: field("lower_bound"),
            upper_bound: field("upper_bound"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionEnvelope {
    pub prediction: PredictionResult,
}
