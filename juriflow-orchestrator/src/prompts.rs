use juriflow_core::QueryOptions;

pub(crate) fn initial_analysis(query: &str, options: &QueryOptions) -> String {
    let mut prompt = String::from(
        "Analyse the legal question below. Identify the governing law, the facts that \
         matter, the strongest arguments on each side and the open risks.",
    );
    if let Some(case_type) = &options.case_type {
        prompt.push_str(&format!("\nCase type: {case_type}."));
    }
    if !options.legal_basis.is_empty() {
        prompt.push_str(&format!("\nCited legal basis: {}.", options.legal_basis.join(", ")));
    }
    prompt.push_str(&format!("\n\nQuestion: {query}"));
    prompt
}

pub(crate) fn expert_review(query: &str, analysis: &str) -> String {
    format!(
        "As a senior legal expert, review the preliminary analysis and give concrete \
         recommendations: next procedural steps, evidence to secure and likely outcome.\n\n\
         Question: {query}\n\nPreliminary analysis:\n{analysis}"
    )
}

pub(crate) fn urgent_administrative_review(query: &str, analysis: &str) -> String {
    format!(
        "URGENT administrative matter. As a senior administrative-law expert, start with \
         the deadlines for appeal and whether interim relief (suspension of the decision) \
         should be requested now, then give the remaining recommendations.\n\n\
         Question: {query}\n\nPreliminary analysis:\n{analysis}"
    )
}
