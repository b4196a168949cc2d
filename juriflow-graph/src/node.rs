use std::fmt;

use serde::{Deserialize, Serialize};

/// Every step of the legal workflow. Routing only ever names one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    DetermineTier,
    VerifyPayment,
    ProcessInput,
    Research,
    ExpertConsultation,
    DocumentPlanning,
    GenerateDocuments,
    FinalReview,
    Error,
    End,
}

impl NodeId {
    pub const ENTRY: NodeId = NodeId::DetermineTier;

    pub fn as_str(self) -> &'static str {
        match self {
            NodeId::DetermineTier => "determine_tier",
            NodeId::VerifyPayment => "verify_payment",
            NodeId::ProcessInput => "process_input",
            NodeId::Research => "research",
            NodeId::ExpertConsultation => "expert_consultation",
            NodeId::DocumentPlanning => "document_planning",
            NodeId::GenerateDocuments => "generate_documents",
            NodeId::FinalReview => "final_review",
            NodeId::Error => "error",
            NodeId::End => "end",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == NodeId::End
    }

    /// Branch taken once input analysis has produced a complexity level.
    pub fn route_by_complexity(level: u64) -> NodeId {
        if level >= 2 {
            NodeId::ExpertConsultation
        } else {
            NodeId::DocumentPlanning
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
