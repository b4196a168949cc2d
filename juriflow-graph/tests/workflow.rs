mod common;

use std::sync::Arc;

use common::{simple_analysis, Harness, Scripted, StubPayment, StubQuota, StubResearch};
use juriflow_core::{CaseStore, InMemoryCaseStore, JuriError, Role};
use juriflow_graph::{
    ExecutionConfig, ExecutionContext, GraphError, LegalWorkflow, NodeId, WorkflowResponse,
};
use serde_json::{json, Map, Value};

fn case_data(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn research_ok() -> StubResearch {
    StubResearch {
        search_fails: false,
        legislation_fails: false,
    }
}

#[tokio::test]
async fn simple_case_runs_straight_to_review() {
    let harness = Harness::new(
        Scripted::new("primary").then_ok(simple_analysis()),
        Scripted::new("secondary"),
    );
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let ctx = ExecutionContext::new("user-1", "case-1").with_query("Recover an unpaid invoice");
    let out = workflow.invoke(ctx).await.unwrap();

    assert_eq!(
        out.completed_nodes,
        vec![
            NodeId::DetermineTier,
            NodeId::VerifyPayment,
            NodeId::ProcessInput,
            NodeId::DocumentPlanning,
            NodeId::GenerateDocuments,
            NodeId::FinalReview,
        ]
    );
    assert_eq!(out.current_node, NodeId::End);
    // analysis, plan, one default document
    assert_eq!(harness.primary.count(), 3);
    assert_eq!(harness.secondary.count(), 1);
    assert!(out.ai_guidance.is_none());
    assert_eq!(out.generated_documents[0].doc_type, "legal_opinion");
    assert_eq!(
        harness
            .quota
            .usage_updates
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    match out.response_data {
        Some(WorkflowResponse::Completed { review, .. }) => assert_eq!(review, "secondary reply"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn exhausted_quota_ends_before_payment() {
    let harness = Harness::new(Scripted::new("primary"), Scripted::new("secondary"))
        .with_quota(StubQuota::new(false));
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let out = workflow
        .invoke(ExecutionContext::new("user-1", "case-1"))
        .await
        .unwrap();

    assert_eq!(out.completed_nodes, vec![NodeId::DetermineTier]);
    assert_eq!(
        harness.payment.calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert_eq!(harness.primary.count(), 0);
    assert!(matches!(
        out.response_data,
        Some(WorkflowResponse::QuotaExceeded {
            required_credits: 5,
            ..
        })
    ));
}

#[tokio::test]
async fn unpaid_case_returns_payment_details() {
    let harness = Harness::new(Scripted::new("primary"), Scripted::new("secondary"))
        .with_payment(StubPayment::new(false));
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let out = workflow
        .invoke(ExecutionContext::new("user-1", "case-2"))
        .await
        .unwrap();

    assert_eq!(harness.primary.count(), 0);
    match out.response_data {
        Some(WorkflowResponse::PaymentRequired {
            payment_details, ..
        }) => assert_eq!(payment_details["case_id"], "case-2"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn complex_administrative_case_consults_expert() {
    let harness = Harness::new(
        Scripted::new("primary").then_ok("{}"),
        Scripted::new("secondary").then_ok("Seek suspension first."),
    );
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let ctx = ExecutionContext::new("user-1", "case-3")
        .with_query("Challenge the tax assessment")
        .with_case_data(case_data(json!({
            "case_type": "administrative",
            "authority": "Tax office",
            "decision_date": "2024-03-01",
            "decision_type": "assessment",
            "urgency": true
        })));
    let out = workflow.invoke(ctx).await.unwrap();

    assert!(out.completed_nodes.contains(&NodeId::ExpertConsultation));
    assert_eq!(out.complexity_level(), 2);
    assert_eq!(out.ai_guidance.as_deref(), Some("Seek suspension first."));
    assert_eq!(out.generated_documents.len(), 3);
    assert_eq!(harness.primary.count(), 5);
    assert_eq!(harness.secondary.count(), 2);
}

#[tokio::test]
async fn research_failure_does_not_stop_the_run() {
    let harness = Harness::new(
        Scripted::new("primary").then_ok(simple_analysis()),
        Scripted::new("secondary"),
    );
    let workflow = LegalWorkflow::builder(harness.services(StubResearch {
        search_fails: true,
        legislation_fails: false,
    }))
        .with_config(ExecutionConfig::default().with_research(true))
        .build();

    let out = workflow
        .invoke(ExecutionContext::new("user-1", "case-4").with_query("Lease dispute"))
        .await
        .unwrap();

    let research = out.research_results.unwrap();
    assert!(research["search"].is_null());
    assert_eq!(research["legislation"][0]["act"], "general procedure act");
    assert!(out.completed_nodes.contains(&NodeId::Research));
    assert!(matches!(
        out.response_data,
        Some(WorkflowResponse::Completed { .. })
    ));
}

#[tokio::test]
async fn legislation_failure_does_not_stop_the_run() {
    let harness = Harness::new(
        Scripted::new("primary").then_ok(simple_analysis()),
        Scripted::new("secondary"),
    );
    let workflow = LegalWorkflow::builder(harness.services(StubResearch {
        search_fails: false,
        legislation_fails: true,
    }))
    .with_config(ExecutionConfig::default().with_research(true))
    .build();

    let out = workflow
        .invoke(ExecutionContext::new("user-1", "case-4b").with_query("Lease dispute"))
        .await
        .unwrap();

    let research = out.research_results.unwrap();
    assert!(research["legislation"].is_null());
    assert_eq!(research["search"][0]["query"], "Lease dispute");
    assert!(out.completed_nodes.contains(&NodeId::Research));
    assert!(out.errors.is_empty());
    assert!(matches!(
        out.response_data,
        Some(WorkflowResponse::Completed { .. })
    ));
}

#[tokio::test]
async fn failing_node_is_retried_then_ticketed() {
    let harness = Harness::new(Scripted::failing("primary"), Scripted::new("secondary"));
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let out = workflow
        .invoke(ExecutionContext::new("user-1", "case-5"))
        .await
        .unwrap();

    assert_eq!(harness.primary.count(), 3);
    assert_eq!(harness.secondary.count(), 0);
    assert_eq!(out.retry_count.get(&NodeId::ProcessInput), Some(&2));
    match out.response_data {
        Some(WorkflowResponse::SupportTicket { errors, .. }) => {
            assert_eq!(errors.len(), 3);
            assert!(errors.iter().all(|entry| entry.node == NodeId::ProcessInput));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn transient_failure_recovers_on_retry() {
    let harness = Harness::new(
        Scripted::new("primary")
            .then_ok(simple_analysis())
            .then_err("overloaded"),
        Scripted::new("secondary"),
    );
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let out = workflow
        .invoke(ExecutionContext::new("user-1", "case-6"))
        .await
        .unwrap();

    assert_eq!(out.retry_count.get(&NodeId::DocumentPlanning), Some(&1));
    assert_eq!(out.errors.len(), 1);
    assert!(matches!(
        out.response_data,
        Some(WorkflowResponse::Completed { .. })
    ));
}

#[tokio::test]
async fn missing_domain_fields_route_to_error() {
    let harness = Harness::new(Scripted::new("primary").then_ok("{}"), Scripted::new("secondary"));
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let ctx = ExecutionContext::new("user-1", "case-7")
        .with_case_data(case_data(json!({"case_type": "labor", "employer": "ACME"})));
    let out = workflow.invoke(ctx).await.unwrap();

    assert!(out.errors[0].error.contains("employee"));
    assert!(matches!(
        out.response_data,
        Some(WorkflowResponse::SupportTicket { .. })
    ));
}

#[tokio::test]
async fn busy_case_is_rejected_without_side_effects() {
    let harness = Harness::new(Scripted::new("primary"), Scripted::new("secondary"));
    let store = InMemoryCaseStore::new();
    store
        .insert("case-8", json!({"processing_state": {"is_processing": true}}))
        .unwrap();
    let workflow = LegalWorkflow::builder(harness.services(research_ok()))
        .with_case_store(Arc::new(store))
        .build();

    let err = workflow
        .invoke(ExecutionContext::new("user-1", "case-8"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraphError::Core(JuriError::AlreadyProcessing { .. })
    ));
    assert_eq!(
        harness.quota.checks.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn case_store_records_completion() {
    let harness = Harness::new(
        Scripted::new("primary").then_ok(simple_analysis()),
        Scripted::new("secondary"),
    );
    let store = Arc::new(InMemoryCaseStore::new());
    store.insert("case-9", json!({"title": "Lee v. Park"})).unwrap();
    let workflow = LegalWorkflow::builder(harness.services(research_ok()))
        .with_case_store(store.clone())
        .build();

    workflow
        .invoke(ExecutionContext::new("user-1", "case-9").with_query("Draft a demand letter"))
        .await
        .unwrap();

    let details = store.get_case_details("case-9").await.unwrap().unwrap();
    let state = details.processing_state;
    assert!(!state.is_processing);
    assert!(state.completed);
    assert!(state.completion_time.is_some());
    assert_eq!(state.completed_nodes.last().map(String::as_str), Some("final_review"));
    assert_eq!(state.conversation_history.len(), 2);
    assert_eq!(details.fields.get("title"), Some(&json!("Lee v. Park")));
}

#[tokio::test]
async fn step_limit_releases_the_case() {
    let harness = Harness::new(Scripted::failing("primary"), Scripted::new("secondary"));
    let store = Arc::new(InMemoryCaseStore::new());
    let workflow = LegalWorkflow::builder(harness.services(research_ok()))
        .with_case_store(store.clone())
        .with_config(ExecutionConfig::default().with_max_steps(2))
        .build();

    let err = workflow
        .invoke(ExecutionContext::new("user-1", "case-10"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraphError::MaxStepsExceeded { max: 2, reached: 2 }
    ));
    let details = store.get_case_details("case-10").await.unwrap().unwrap();
    assert!(!details.processing_state.is_processing);
}

#[tokio::test]
async fn query_and_outcome_are_appended_to_history() {
    let harness = Harness::new(
        Scripted::new("primary").then_ok(simple_analysis()),
        Scripted::new("secondary").then_ok("Looks sound."),
    );
    let workflow = LegalWorkflow::builder(harness.services(research_ok())).build();

    let out = workflow
        .invoke(ExecutionContext::new("user-1", "case-11").with_query("Is the clause valid?"))
        .await
        .unwrap();

    assert_eq!(out.messages.len(), 2);
    assert_eq!(out.messages[0].role, Role::User);
    assert_eq!(out.messages[0].content, "Is the clause valid?");
    assert_eq!(out.messages[1].role, Role::Assistant);
    assert_eq!(out.messages[1].content, "Looks sound.");
}
