use serde::{Deserialize, Serialize};

use crate::domain::{RiskLevel, Urgency};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Structured triage result for one turn. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageReply {
    pub response: String,
    pub emergency: bool,
    pub urgency: Urgency,
    pub risk_level: RiskLevel,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// Server-reported processing time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom_analysis: Option<SymptomAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimers: Option<Vec<String>>,
    /// Triage reasoning trace; carried but not part of layered rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomAnalysis {
    #[serde(default)]
    pub possible_conditions: Vec<ConditionMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionMatch {
    pub condition: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Error body the service attaches to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Body of `GET /health-tips`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthTipsResponse {
    pub tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_deserializes_with_optional_fields_absent() {
        let raw = r#"{
            "response": "Rest and hydrate.",
            "emergency": false,
            "urgency": "routine",
            "risk_level": "low",
            "confidence": 0.6
        }"#;
        let reply: TriageReply = serde_json::from_str(raw).expect("parse");
        assert!(!reply.emergency);
        assert_eq!(reply.urgency.style_key(), "routine");
        assert!(reply.symptom_analysis.is_none());
        assert!(reply.disclaimers.is_none());
    }

    #[test]
    fn reply_tolerates_unknown_fields_and_empty_conditions() {
        let raw = r#"{
            "response": "ok",
            "emergency": false,
            "urgency": "routine",
            "risk_level": "low",
            "confidence": 0.5,
            "symptom_analysis": { "possible_conditions": [] },
            "safety_override": true
        }"#;
        let reply: TriageReply = serde_json::from_str(raw).expect("parse");
        let analysis = reply.symptom_analysis.expect("analysis");
        assert!(analysis.possible_conditions.is_empty());
    }
}
