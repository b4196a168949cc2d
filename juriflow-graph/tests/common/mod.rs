#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use juriflow_core::{
    JuriError, LegalResearch, PaymentService, PaymentStatus, Processor, QuotaService, QuotaStatus,
    Value,
};
use juriflow_graph::WorkflowServices;
use serde_json::json;

/// Replays queued replies in order, then falls back to `default_reply`.
/// `Err` entries surface as backend failures.
pub struct Scripted {
    name: &'static str,
    replies: Mutex<VecDeque<Result<String, String>>>,
    default_reply: Option<String>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            replies: Mutex::new(VecDeque::new()),
            default_reply: Some(format!("{name} reply")),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            default_reply: None,
            ..Self::new(name)
        }
    }

    pub fn then_ok(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn then_err(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Processor for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn initialize(&self) -> Result<(), JuriError> {
        Ok(())
    }

    async fn generate(&self, _context: &Value, prompt: &str) -> Result<String, JuriError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(JuriError::Backend(message)),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| JuriError::Backend("scripted failure".to_string())),
        }
    }
}

pub struct StubQuota {
    pub has_quota: bool,
    pub checks: AtomicUsize,
    pub usage_updates: AtomicUsize,
}

impl StubQuota {
    pub fn new(has_quota: bool) -> Self {
        Self {
            has_quota,
            checks: AtomicUsize::new(0),
            usage_updates: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl QuotaService for StubQuota {
    async fn check_quota(&self, _user_id: &str) -> Result<QuotaStatus, JuriError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(QuotaStatus {
            has_quota: self.has_quota,
            required_credits: if self.has_quota { 0 } else { 5 },
        })
    }

    async fn update_quota_usage(&self, _user_id: &str, _kind: &str) -> Result<(), JuriError> {
        self.usage_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct StubPayment {
    pub paid: bool,
    pub calls: AtomicUsize,
}

impl StubPayment {
    pub fn new(paid: bool) -> Self {
        Self {
            paid,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl PaymentService for StubPayment {
    async fn verify_payment(&self, case_id: &str) -> Result<PaymentStatus, JuriError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentStatus {
            paid: self.paid,
            payment_details: json!({"case_id": case_id, "amount_due": 49}),
        })
    }
}

pub struct StubResearch {
    pub search_fails: bool,
    pub legislation_fails: bool,
}

#[async_trait::async_trait]
impl LegalResearch for StubResearch {
    async fn search_legal_database(&self, query: &str) -> Result<Value, JuriError> {
        if self.search_fails {
            return Err(JuriError::collaborator("legal_research", "index offline"));
        }
        Ok(json!([{"title": "Precedent", "query": query}]))
    }

    async fn get_relevant_legislation(&self, domain: &str) -> Result<Value, JuriError> {
        if self.legislation_fails {
            return Err(JuriError::collaborator("legal_research", "legislation feed down"));
        }
        Ok(json!([{"act": format!("{domain} procedure act")}]))
    }
}

pub struct Harness {
    pub primary: Arc<Scripted>,
    pub secondary: Arc<Scripted>,
    pub quota: Arc<StubQuota>,
    pub payment: Arc<StubPayment>,
}

impl Harness {
    pub fn new(primary: Scripted, secondary: Scripted) -> Self {
        Self {
            primary: Arc::new(primary),
            secondary: Arc::new(secondary),
            quota: Arc::new(StubQuota::new(true)),
            payment: Arc::new(StubPayment::new(true)),
        }
    }

    pub fn with_quota(mut self, quota: StubQuota) -> Self {
        self.quota = Arc::new(quota);
        self
    }

    pub fn with_payment(mut self, payment: StubPayment) -> Self {
        self.payment = Arc::new(payment);
        self
    }

    pub fn services(&self, research: StubResearch) -> WorkflowServices {
        WorkflowServices {
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
            quota: self.quota.clone(),
            payment: self.payment.clone(),
            research: Arc::new(research),
        }
    }
}

pub fn simple_analysis() -> &'static str {
    r#"{"summary": "Unpaid invoice", "complexity": {"level": 1}}"#
}
