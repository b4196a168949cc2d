//! Caller-supplied query configuration.
//!
//! A [`QueryContext`] is the loosely-typed option bag a caller hands to the
//! orchestrator. [`QueryContext::normalize`] coerces the recognised keys in
//! place and returns the typed [`QueryOptions`] view of them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::retry::{RetryPolicy, RetryStrategy};
use crate::JuriError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryContext(Map<String, Value>);

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, JuriError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(JuriError::InvalidConfig(format!(
                "query context must be an object, got {other}"
            ))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn case_id(&self) -> Option<String> {
        self.0.get("case_id").and_then(as_text)
    }

    /// Copies entries from `persisted` whose keys the caller did not supply.
    pub fn merge_missing(&mut self, persisted: &Map<String, Value>) {
        for (key, value) in persisted {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    /// Coerces `claim_value` to a number and `legal_basis`/`parties` to
    /// sequences of text, then returns the typed options.
    pub fn normalize(&mut self) -> Result<QueryOptions, JuriError> {
        let options = QueryOptions::parse(self)?;
        if let Some(claim_value) = options.claim_value {
            if let Some(number) = serde_json::Number::from_f64(claim_value) {
                self.0.insert("claim_value".to_string(), Value::Number(number));
            }
        }
        if self.0.contains_key("legal_basis") {
            self.0
                .insert("legal_basis".to_string(), text_list(&options.legal_basis));
        }
        if self.0.contains_key("parties") {
            self.0.insert("parties".to_string(), text_list(&options.parties));
        }
        Ok(options)
    }
}

impl From<Map<String, Value>> for QueryContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for QueryContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Typed view over the recognised [`QueryContext`] keys.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    pub case_type: Option<String>,
    pub claim_value: Option<f64>,
    pub legal_basis: Vec<String>,
    pub parties: Vec<String>,
    pub urgency: bool,
    pub retry_strategy: RetryStrategy,
    pub max_retries: usize,
    /// Either `retry_strategy` or `max_retries` was supplied.
    pub retry_requested: bool,
    pub enable_fallback: bool,
    pub allow_partial_results: bool,
    pub track_performance: bool,
    pub resume: bool,
    pub case_id: Option<String>,
}

impl QueryOptions {
    pub fn parse(context: &QueryContext) -> Result<Self, JuriError> {
        let map = context.as_map();
        let claim_value = match map.get("claim_value") {
            None | Some(Value::Null) => None,
            Some(value) => Some(coerce_number(value)?),
        };
        let max_retries = map.get("max_retries").and_then(coerce_count).unwrap_or(1);

        Ok(Self {
            case_type: map.get("case_type").and_then(as_text),
            claim_value,
            legal_basis: map.get("legal_basis").map(as_text_list).unwrap_or_default(),
            parties: map.get("parties").map(as_text_list).unwrap_or_default(),
            urgency: flag(map, "urgency"),
            retry_strategy: RetryStrategy::parse(
                map.get("retry_strategy").and_then(Value::as_str),
            ),
            max_retries,
            retry_requested: map.contains_key("retry_strategy") || map.contains_key("max_retries"),
            enable_fallback: flag(map, "enable_fallback"),
            allow_partial_results: flag(map, "allow_partial_results"),
            track_performance: flag(map, "track_performance"),
            resume: flag(map, "resume"),
            case_id: context.case_id(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_strategy)
    }

    pub fn uses_retry_mode(&self) -> bool {
        self.retry_requested || self.enable_fallback
    }

    pub fn is_urgent_administrative(&self) -> bool {
        self.urgency && self.case_type.as_deref() == Some("administrative")
    }
}

fn coerce_number(value: &Value) -> Result<f64, JuriError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| JuriError::InvalidClaimValue {
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
}

/// Non-negative whole number, accepting integral floats such as `3.0`.
fn coerce_count(value: &Value) -> Option<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0 && parsed.fract() == 0.0 && parsed <= usize::MAX as f64)
        .then_some(parsed as usize)
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !matches!(s.trim(), "" | "0" | "false" | "False"),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        other => vec![other.to_string()],
    }
}

fn text_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> QueryContext {
        QueryContext::from_value(value).unwrap()
    }

    #[test]
    fn numeric_string_claim_value_is_coerced() {
        let mut ctx = context(json!({"case_type": "civil", "claim_value": " 1500.5 "}));
        let options = ctx.normalize().unwrap();
        assert_eq!(options.claim_value, Some(1500.5));
        assert_eq!(ctx.get("claim_value"), Some(&json!(1500.5)));
    }

    #[test]
    fn non_numeric_claim_value_is_rejected() {
        let mut ctx = context(json!({"claim_value": "not-a-number"}));
        let err = ctx.normalize().unwrap_err();
        assert!(matches!(err, JuriError::InvalidClaimValue { ref value } if value == "not-a-number"));
    }

    #[test]
    fn scalar_parties_become_sequences() {
        let mut ctx = context(json!({"parties": "ACME", "legal_basis": ["art. 415", 12]}));
        let options = ctx.normalize().unwrap();
        assert_eq!(options.parties, vec!["ACME".to_string()]);
        assert_eq!(options.legal_basis, vec!["art. 415".to_string(), "12".to_string()]);
        assert_eq!(ctx.get("parties"), Some(&json!(["ACME"])));
    }

    #[test]
    fn defaults_apply_when_options_absent() {
        let options = QueryOptions::parse(&context(json!({"case_type": "labor"}))).unwrap();
        assert_eq!(options.max_retries, 1);
        assert_eq!(options.retry_strategy, RetryStrategy::Immediate);
        assert!(!options.enable_fallback);
        assert!(!options.allow_partial_results);
        assert!(!options.uses_retry_mode());
    }

    #[test]
    fn integral_float_max_retries_is_accepted() {
        let options = QueryOptions::parse(&context(json!({"max_retries": 3.0}))).unwrap();
        assert_eq!(options.max_retries, 3);
        let options = QueryOptions::parse(&context(json!({"max_retries": "4"}))).unwrap();
        assert_eq!(options.max_retries, 4);
        let options = QueryOptions::parse(&context(json!({"max_retries": 2.5}))).unwrap();
        assert_eq!(options.max_retries, 1);
        let options = QueryOptions::parse(&context(json!({"max_retries": -2}))).unwrap();
        assert_eq!(options.max_retries, 1);
    }

    #[test]
    fn merge_missing_keeps_caller_keys() {
        let mut ctx = context(json!({"case_type": "civil"}));
        let persisted = json!({"case_type": "labor", "current_node": "legal_analysis"});
        ctx.merge_missing(persisted.as_object().unwrap());
        assert_eq!(ctx.get("case_type"), Some(&json!("civil")));
        assert_eq!(ctx.get("current_node"), Some(&json!("legal_analysis")));
    }

    #[test]
    fn urgent_administrative_needs_both_flags() {
        let urgent = QueryOptions::parse(&context(
            json!({"case_type": "administrative", "urgency": true}),
        ))
        .unwrap();
        assert!(urgent.is_urgent_administrative());

        let civil = QueryOptions::parse(&context(json!({"case_type": "civil", "urgency": true})))
            .unwrap();
        assert!(!civil.is_urgent_administrative());
    }
}
