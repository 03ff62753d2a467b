use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommercialRelationship {
    Passfort,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Company,
    Individual,
}

impl EntityType {
    /// Directory under the static root holding this entity's files.
    pub fn as_dir(&self) -> &'static str {
        match self {
            EntityType::Company => "company",
            EntityType::Individual => "individual",
        }
    }

    pub fn demo_results_dir(&self) -> &'static str {
        match self {
            EntityType::Company => "companies",
            EntityType::Individual => "individuals",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    InvalidCredentials,
    InvalidConfig,
    MissingCheckInput,
    InvalidCheckInput,
    ProviderConnection,
    ProviderMessage,
    UnsupportedDemoResult,
}

/// Error reported inside a check response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckError {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
}

impl CheckError {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            sub_type: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn not_implemented() -> Self {
        Self::new(ErrorType::InvalidCheckInput, "Not implemented!")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub counter: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInput {
    pub entity_type: EntityType,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartCheckRequest {
    pub id: Uuid,
    #[serde(default)]
    pub demo_result: Option<String>,
    pub commercial_relationship: CommercialRelationship,
    pub check_input: CheckInput,
    pub provider_config: Value,
    #[serde(default)]
    pub provider_credentials: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartCheckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_data: Option<Value>,
    #[serde(default)]
    pub warnings: Vec<Value>,
    #[serde(default)]
    pub errors: Vec<CheckError>,
}

impl StartCheckResponse {
    pub fn error(errors: Vec<CheckError>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollCheckRequest {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub reference: String,
    #[serde(default)]
    pub demo_result: Option<String>,
    pub commercial_relationship: CommercialRelationship,
    pub provider_config: Value,
    #[serde(default)]
    pub provider_credentials: Option<Value>,
    pub custom_data: CustomData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollCheckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_output: Option<Value>,
    #[serde(default)]
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub warnings: Vec<Value>,
    #[serde(default)]
    pub errors: Vec<CheckError>,
    #[serde(default)]
    pub pending: bool,
}

impl PollCheckResponse {
    pub fn error(errors: Vec<CheckError>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_request_parses() {
        let request: StartCheckRequest = serde_json::from_value(json!({
            "id": "0c8c7d1c-8d0a-4b55-9a0b-0d6a4a0c6a11",
            "check_input": {
                "entity_type": "COMPANY",
                "metadata": { "name": "PASSFORT LIMITED" }
            },
            "commercial_relationship": "DIRECT",
            "provider_config": {},
            "demo_result": "ALL_DATA"
        }))
        .unwrap();

        assert_eq!(request.check_input.entity_type, EntityType::Company);
        assert!(request.check_input.fields.contains_key("metadata"));
        assert_eq!(request.demo_result.as_deref(), Some("ALL_DATA"));
    }

    #[test]
    fn test_start_request_requires_fields() {
        let missing_config = serde_json::from_value::<StartCheckRequest>(json!({
            "id": "0c8c7d1c-8d0a-4b55-9a0b-0d6a4a0c6a11",
            "check_input": { "entity_type": "COMPANY" },
            "commercial_relationship": "DIRECT"
        }));
        assert!(missing_config.is_err());

        let bad_relationship = serde_json::from_value::<StartCheckRequest>(json!({
            "id": "0c8c7d1c-8d0a-4b55-9a0b-0d6a4a0c6a11",
            "check_input": { "entity_type": "COMPANY" },
            "commercial_relationship": "SOMETIMES",
            "provider_config": {}
        }));
        assert!(bad_relationship.is_err());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = StartCheckResponse::error(vec![CheckError::not_implemented()]);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({
                "warnings": [],
                "errors": [{ "type": "INVALID_CHECK_INPUT", "message": "Not implemented!" }]
            })
        );
    }
}
