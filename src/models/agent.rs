use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use thiserror::Error;

pub const MIN_PROBLEM_CHARS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid body. Send JSON {{ \"problem\": \"...\", \"critic\": true/false }}")]
    InvalidBody,

    #[error("Field 'problem' is required (string of at least 8 characters describing the case).")]
    InvalidProblem,

    #[error("Field 'critic' must be a boolean (true/false) when present.")]
    InvalidCritic,
}

/// A validated `POST /agent` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub problem: String,
    pub critic: bool,
}

impl AgentRequest {
    /// Parses and validates a raw request body.
    ///
    /// `problem` must be a string of at least [`MIN_PROBLEM_CHARS`] characters.
    /// `critic` defaults to `true` when absent and must otherwise be a boolean (`null` included).
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        let value: JsonValue = serde_json::from_slice(body).map_err(|_| RequestError::InvalidBody)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &JsonValue) -> Result<Self, RequestError> {
        let body = value.as_object().ok_or(RequestError::InvalidBody)?;

        let problem = match body.get("problem") {
            Some(JsonValue::String(s)) if s.chars().count() >= MIN_PROBLEM_CHARS => s.clone(),
            _ => {
                return Err(RequestError::InvalidProblem);
            }
        };

        let critic = match body.get("critic") {
            None => true,
            Some(JsonValue::Bool(b)) => *b,
            Some(_) => {
                return Err(RequestError::InvalidCritic);
            }
        };

        Ok(Self { problem, critic })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub proposal: String,
    pub critic_review: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn critic_defaults_to_true() {
        let req = AgentRequest::from_value(&json!({ "problem": "Preciso de um chatbot" })).unwrap();
        assert_eq!(req.problem, "Preciso de um chatbot");
        assert!(req.critic);
    }

    #[test]
    fn null_critic_is_not_a_boolean() {
        let body = json!({ "problem": "Preciso de um chatbot", "critic": null });
        assert_eq!(AgentRequest::from_value(&body), Err(RequestError::InvalidCritic));
    }

    #[test]
    fn explicit_critic_false_is_kept() {
        let req = AgentRequest::from_value(
            &json!({ "problem": "Preciso de um chatbot", "critic": false })
        ).unwrap();
        assert!(!req.critic);
    }

    #[test]
    fn short_missing_or_non_string_problem_is_rejected() {
        for body in [
            json!({ "problem": "ok" }),
            json!({ "problem": "" }),
            json!({ "problem": "1234567" }),
            json!({ "critic": false }),
            json!({ "problem": 12345678 }),
            json!({ "problem": null }),
        ] {
            assert_eq!(AgentRequest::from_value(&body), Err(RequestError::InvalidProblem));
        }
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 8 characters, more than 8 bytes
        let req = AgentRequest::from_value(&json!({ "problem": "ãéíóúçãé" })).unwrap();
        assert_eq!(req.problem.chars().count(), 8);
        assert!(AgentRequest::from_value(&json!({ "problem": "ãéíóúçã" })).is_err());
    }

    #[test]
    fn non_boolean_critic_is_rejected() {
        let body = json!({ "problem": "Preciso de um chatbot", "critic": "yes" });
        assert_eq!(AgentRequest::from_value(&body), Err(RequestError::InvalidCritic));
        let body = json!({ "problem": "Preciso de um chatbot", "critic": 0 });
        assert_eq!(AgentRequest::from_value(&body), Err(RequestError::InvalidCritic));
    }

    #[test]
    fn malformed_or_non_object_body_is_invalid() {
        assert_eq!(AgentRequest::from_slice(b"{not json"), Err(RequestError::InvalidBody));
        assert_eq!(AgentRequest::from_slice(b""), Err(RequestError::InvalidBody));
        assert_eq!(AgentRequest::from_slice(b"[1,2]"), Err(RequestError::InvalidBody));
        assert_eq!(AgentRequest::from_slice(b"\"problem\""), Err(RequestError::InvalidBody));
    }

    #[test]
    fn absent_critique_serializes_as_null() {
        let result = PipelineResult { proposal: "p".into(), critic_review: None };
        let json = serde_json::to_value(ApiSuccess::new(result)).unwrap();
        assert_eq!(json, json!({ "ok": true, "data": { "proposal": "p", "critic_review": null } }));
    }
}
