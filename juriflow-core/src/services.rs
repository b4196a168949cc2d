//! Collaborator contracts consumed by the workflow: quota, payment and
//! legal research. Implementations live outside this workspace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{JuriError, Value};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QuotaStatus {
    pub has_quota: bool,
    #[serde(default)]
    pub required_credits: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentStatus {
    pub paid: bool,
    #[serde(default)]
    pub payment_details: Value,
}

#[async_trait]
pub trait QuotaService: Send + Sync {
    async fn check_quota(&self, user_id: &str) -> Result<QuotaStatus, JuriError>;

    async fn update_quota_usage(&self, user_id: &str, kind: &str) -> Result<(), JuriError>;
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn verify_payment(&self, case_id: &str) -> Result<PaymentStatus, JuriError>;
}

#[async_trait]
pub trait LegalResearch: Send + Sync {
    async fn search_legal_database(&self, query: &str) -> Result<Value, JuriError>;

    async fn get_relevant_legislation(&self, domain: &str) -> Result<Value, JuriError>;
}
