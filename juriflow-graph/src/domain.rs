//! Per-domain intake rules used to pick the workflow branch.
//!
//! Each supported legal domain declares the fields an intake must carry, the
//! documents usually filed, and a handful of flags whose count drives a 1–3
//! complexity score. Scores of 2 and above send the case to expert
//! consultation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use juriflow_core::JuriError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegalDomain {
    Civil,
    Commercial,
    Administrative,
    Labor,
}

impl LegalDomain {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "civil" => Some(LegalDomain::Civil),
            "commercial" => Some(LegalDomain::Commercial),
            "administrative" => Some(LegalDomain::Administrative),
            "labor" | "labour" => Some(LegalDomain::Labor),
            _ => None,
        }
    }

    fn rules(self) -> &'static DomainRules {
        match self {
            LegalDomain::Civil => &CIVIL,
            LegalDomain::Commercial => &COMMERCIAL,
            LegalDomain::Administrative => &ADMINISTRATIVE,
            LegalDomain::Labor => &LABOR,
        }
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        self.rules().required_fields
    }

    pub fn document_catalog(self) -> &'static [&'static str] {
        self.rules().documents
    }
}

impl fmt::Display for LegalDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LegalDomain::Civil => "civil",
            LegalDomain::Commercial => "commercial",
            LegalDomain::Administrative => "administrative",
            LegalDomain::Labor => "labor",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DomainSummary {
    #[serde(rename = "type")]
    pub domain: LegalDomain,
    pub complexity_score: u8,
    pub required_documents: Vec<String>,
    pub flags: BTreeMap<String, bool>,
}

struct DomainRules {
    required_fields: &'static [&'static str],
    documents: &'static [&'static str],
    flags: fn(&Map<String, Value>) -> Vec<(&'static str, bool)>,
}

static CIVIL: DomainRules = DomainRules {
    required_fields: &["parties", "claim_value", "facts"],
    documents: &["statement_of_claim", "evidence_list", "power_of_attorney"],
    flags: |analysis| {
        vec![
            ("high_claim_value", number(analysis, "claim_value") > 100_000.0),
            ("multiple_parties", list_len(analysis, "parties") > 2),
            ("has_precedents", boolean(analysis, "has_precedents")),
        ]
    },
};

static COMMERCIAL: DomainRules = DomainRules {
    required_fields: &["parties", "contract_type", "claim_value"],
    documents: &["commercial_claim", "contract_copy", "invoice_schedule"],
    flags: |analysis| {
        vec![
            ("high_claim_value", number(analysis, "claim_value") > 500_000.0),
            ("international", boolean(analysis, "international")),
            ("multiple_contracts", boolean(analysis, "multiple_contracts")),
        ]
    },
};

static ADMINISTRATIVE: DomainRules = DomainRules {
    required_fields: &["authority", "decision_date", "decision_type"],
    documents: &[
        "administrative_complaint",
        "decision_copy",
        "motion_to_suspend",
    ],
    flags: |analysis| {
        vec![
            ("urgency", boolean(analysis, "urgency")),
            ("eu_law", boolean(analysis, "eu_law")),
            ("constitutional_issue", boolean(analysis, "constitutional_issue")),
        ]
    },
};

static LABOR: DomainRules = DomainRules {
    required_fields: &["employer", "employee", "employment_type"],
    documents: &["labor_claim", "employment_contract", "pay_slips"],
    flags: |analysis| {
        vec![
            ("collective", boolean(analysis, "collective")),
            ("discrimination", boolean(analysis, "discrimination")),
            ("high_claim_value", number(analysis, "claim_value") > 50_000.0),
        ]
    },
};

/// Checks `analysis` against the rules of `domain` and scores it.
pub fn validate_domain(
    domain: &str,
    analysis: &Map<String, Value>,
) -> Result<DomainSummary, JuriError> {
    let parsed = LegalDomain::parse(domain).ok_or_else(|| JuriError::Validation {
        missing: vec![format!("supported domain (got '{domain}')")],
    })?;
    let rules = parsed.rules();

    let missing: Vec<String> = rules
        .required_fields
        .iter()
        .filter(|field| !is_present(analysis.get(**field)))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(JuriError::Validation { missing });
    }

    let flags = (rules.flags)(analysis);
    let raised = flags.iter().filter(|(_, set)| *set).count();
    let complexity_score = (1 + raised).clamp(1, 3) as u8;

    Ok(DomainSummary {
        domain: parsed,
        complexity_score,
        required_documents: rules.documents.iter().map(|d| d.to_string()).collect(),
        flags: flags
            .into_iter()
            .map(|(name, set)| (name.to_string(), set))
            .collect(),
    })
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

fn number(analysis: &Map<String, Value>, key: &str) -> f64 {
    match analysis.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn list_len(analysis: &Map<String, Value>, key: &str) -> usize {
    match analysis.get(key) {
        Some(Value::Array(items)) => items.len(),
        Some(Value::String(s)) if !s.is_empty() => 1,
        _ => 0,
    }
}

fn boolean(analysis: &Map<String, Value>, key: &str) -> bool {
    matches!(analysis.get(key), Some(Value::Bool(true)))
}
