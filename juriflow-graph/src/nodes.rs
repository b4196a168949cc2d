use serde_json::{json, Map, Value};
use tracing::Instrument;

use crate::domain::validate_domain;
use crate::graph::WorkflowServices;
use crate::{
    DocumentPlan, ExecutionConfig, ExecutionContext, GeneratedDocument, NodeId, WorkflowResponse,
};

const DEFAULT_DOCUMENT: &str = "legal_opinion";

fn analysis_prompt(query: &str) -> String {
    format!(
        "Analyse the following legal request. Reply with a JSON object containing \
         `domain` (civil, commercial, administrative or labor), `summary`, any case facts \
         you can extract, and `complexity` as {{\"level\": 1-3}}.\n\nRequest: {query}"
    )
}

fn expert_prompt(query: &str) -> String {
    format!(
        "Review the input analysis and research for this case and give expert guidance: \
         strategy, risks, and what must be established.\n\nRequest: {query}"
    )
}

fn planning_prompt(documents: &[String]) -> String {
    format!(
        "Prepare an outline for drafting these documents, noting for each what facts and \
         legal grounds it must state: {}",
        documents.join(", ")
    )
}

fn drafting_prompt(doc_type: &str, outline: &str) -> String {
    format!("Draft the document `{doc_type}` following this plan:\n{outline}")
}

const REVIEW_PROMPT: &str = "Review the drafted documents for legal accuracy, consistency \
with the case facts and completeness. List required corrections, then give a final verdict.";

/// Pulls the first JSON object out of a model reply; plain prose is kept as
/// a summary.
fn parse_analysis(text: &str) -> Map<String, Value> {
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<Value>(&text[start..=end]).ok()
        }
        _ => None,
    };
    match object {
        Some(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("summary".to_string(), Value::String(text.to_string()));
            map
        }
    }
}

fn domain_of(ctx: &ExecutionContext, analysis: &Map<String, Value>) -> Option<String> {
    ctx.case_data
        .get("case_type")
        .or_else(|| analysis.get("domain"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) async fn determine_tier(
    services: &WorkflowServices,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::DetermineTier;
    match services.quota.check_quota(&ctx.user_id).await {
        Ok(status) => {
            let exhausted = !status.has_quota;
            let required_credits = status.required_credits;
            ctx.quota_status = Some(status);
            if exhausted {
                tracing::info!(user_id = %ctx.user_id, required_credits, "quota exceeded");
                ctx.response_data = Some(WorkflowResponse::QuotaExceeded {
                    required_credits,
                    message: "Your plan has no remaining analysis credits.".to_string(),
                });
                return ctx.advance(node, NodeId::End);
            }
            ctx.advance(node, NodeId::VerifyPayment)
        }
        Err(err) => ctx.fail(node, &err),
    }
}

pub(crate) async fn verify_payment(
    services: &WorkflowServices,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::VerifyPayment;
    match services.payment.verify_payment(&ctx.case_id).await {
        Ok(status) => {
            let paid = status.paid;
            let details = status.payment_details.clone();
            ctx.payment_status = Some(status);
            if !paid {
                ctx.response_data = Some(WorkflowResponse::PaymentRequired {
                    payment_details: details,
                    message: "Payment for this case has not been completed.".to_string(),
                });
                return ctx.advance(node, NodeId::End);
            }
            ctx.advance(node, NodeId::ProcessInput)
        }
        Err(err) => ctx.fail(node, &err),
    }
}

pub(crate) async fn process_input(
    services: &WorkflowServices,
    config: &ExecutionConfig,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::ProcessInput;
    let text = match services
        .primary
        .generate(&Value::Object(ctx.case_data.clone()), &analysis_prompt(&ctx.query))
        .await
    {
        Ok(text) => text,
        Err(err) => return ctx.fail(node, &err),
    };

    let mut analysis = parse_analysis(&text);
    for (key, value) in &ctx.case_data {
        analysis.insert(key.clone(), value.clone());
    }

    if let Some(domain) = domain_of(&ctx, &analysis) {
        match validate_domain(&domain, &analysis) {
            Ok(summary) => {
                analysis.insert(
                    "complexity".to_string(),
                    json!({"level": summary.complexity_score}),
                );
                analysis.insert(
                    "domain_summary".to_string(),
                    serde_json::to_value(&summary).unwrap_or_default(),
                );
                ctx.domain_summary = Some(summary);
            }
            Err(err) => {
                ctx.input_analysis = Some(analysis);
                return ctx.fail(node, &err);
            }
        }
    }
    if !analysis.contains_key("complexity") {
        analysis.insert("complexity".to_string(), json!({"level": 1}));
    }
    ctx.input_analysis = Some(analysis);

    let next = if config.enable_research {
        NodeId::Research
    } else {
        NodeId::route_by_complexity(ctx.complexity_level())
    };
    ctx.advance(node, next)
}

/// Search and legislation lookup run together; a failing half leaves `null`
/// in its slot and the workflow carries on.
pub(crate) async fn research(
    services: &WorkflowServices,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::Research;
    let domain = ctx
        .domain_summary
        .as_ref()
        .map(|summary| summary.domain.to_string())
        .unwrap_or_else(|| "general".to_string());

    let (search, legislation) = futures::join!(
        services.research.search_legal_database(&ctx.query),
        services.research.get_relevant_legislation(&domain),
    );
    let search = search.unwrap_or_else(|err| {
        tracing::warn!(case_id = %ctx.case_id, error = %err, "legal search failed, continuing without it");
        Value::Null
    });
    let legislation = legislation.unwrap_or_else(|err| {
        tracing::warn!(case_id = %ctx.case_id, error = %err, "legislation lookup failed, continuing without it");
        Value::Null
    });

    ctx.research_results = Some(json!({"search": search, "legislation": legislation}));
    let next = NodeId::route_by_complexity(ctx.complexity_level());
    ctx.advance(node, next)
}

pub(crate) async fn expert_consultation(
    services: &WorkflowServices,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::ExpertConsultation;
    match services
        .secondary
        .generate(&ctx.prompt_context(), &expert_prompt(&ctx.query))
        .await
    {
        Ok(guidance) => {
            ctx.ai_guidance = Some(guidance);
            ctx.advance(node, NodeId::DocumentPlanning)
        }
        Err(err) => ctx.fail(node, &err),
    }
}

pub(crate) async fn document_planning(
    services: &WorkflowServices,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::DocumentPlanning;
    let documents = ctx
        .domain_summary
        .as_ref()
        .map(|summary| summary.required_documents.clone())
        .filter(|documents| !documents.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_DOCUMENT.to_string()]);

    match services
        .primary
        .generate(&ctx.prompt_context(), &planning_prompt(&documents))
        .await
    {
        Ok(outline) => {
            ctx.document_plan = Some(DocumentPlan { documents, outline });
            ctx.advance(node, NodeId::GenerateDocuments)
        }
        Err(err) => ctx.fail(node, &err),
    }
}

pub(crate) async fn generate_documents(
    services: &WorkflowServices,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::GenerateDocuments;
    let plan = ctx.document_plan.clone().unwrap_or_default();
    let context = ctx.prompt_context();

    let mut drafted = Vec::with_capacity(plan.documents.len());
    for doc_type in &plan.documents {
        let span = tracing::debug_span!("draft_document", doc_type = %doc_type);
        match services
            .primary
            .generate(&context, &drafting_prompt(doc_type, &plan.outline))
            .instrument(span)
            .await
        {
            Ok(content) => drafted.push(GeneratedDocument {
                doc_type: doc_type.clone(),
                content,
            }),
            Err(err) => return ctx.fail(node, &err),
        }
    }

    ctx.generated_documents = drafted;
    ctx.advance(node, NodeId::FinalReview)
}

pub(crate) async fn final_review(
    services: &WorkflowServices,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let node = NodeId::FinalReview;
    let context = json!({
        "documents": ctx.generated_documents,
        "ai_guidance": ctx.ai_guidance,
    });
    let review = match services.secondary.generate(&context, REVIEW_PROMPT).await {
        Ok(review) => review,
        Err(err) => return ctx.fail(node, &err),
    };

    if let Err(err) = services
        .quota
        .update_quota_usage(&ctx.user_id, "legal_analysis")
        .await
    {
        tracing::warn!(user_id = %ctx.user_id, error = %err, "failed to record quota usage");
    }

    ctx.final_review_results = Some(review.clone());
    ctx.response_data = Some(WorkflowResponse::Completed {
        documents: ctx.generated_documents.clone(),
        expert_guidance: ctx.ai_guidance.clone(),
        review,
    });
    ctx.advance(node, NodeId::End)
}

/// Re-dispatches the failing node while it has retries left, otherwise ends
/// the run with a support-ticket response carrying every recorded error.
pub(crate) fn error_node(
    config: &ExecutionConfig,
    mut ctx: ExecutionContext,
) -> (NodeId, ExecutionContext) {
    let failing = ctx.current_node;
    let attempts = ctx.retry_count.entry(failing).or_insert(0);
    if *attempts < config.max_node_retries {
        *attempts += 1;
        tracing::info!(node = %failing, attempt = *attempts, "retrying failed node");
        return (failing, ctx);
    }

    tracing::error!(
        node = %failing,
        case_id = %ctx.case_id,
        errors = ctx.errors.len(),
        "node retries exhausted, filing support ticket"
    );
    ctx.response_data = Some(WorkflowResponse::SupportTicket {
        message: "We could not complete your request. A support ticket has been filed and \
                  our team will follow up."
            .to_string(),
        errors: ctx.errors.clone(),
    });
    (NodeId::End, ctx)
}
