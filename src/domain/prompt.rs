//! Conversation context for outbound calls

use crate::domain::agent::KnowledgeDocument;

const OUTBOUND_GUIDANCE: &str = "\
You are placing an OUTBOUND phone call on behalf of the business. The person \
you are calling did not call you. Introduce yourself and the business, state \
the reason for the call early, and keep turns short. If the person asks not \
to be called again, apologise, confirm, and end the call politely. If you \
reach voicemail, leave a brief message with a callback reason and hang up.";

/// Opening line spoken as soon as the callee picks up
pub fn outbound_first_message(agent_name: &str, business_name: &str) -> String {
    format!(
        "Hi, this is {} calling from {}. Do you have a quick moment?",
        agent_name, business_name
    )
}

/// Full system prompt for an outbound call.
///
/// Campaign and knowledge sections are omitted when absent or blank.
pub fn outbound_call_prompt(
    agent_system_prompt: &str,
    campaign_context: Option<&str>,
    knowledge_content: Option<&str>,
) -> String {
    let mut prompt = String::new();
    let base = agent_system_prompt.trim();
    if !base.is_empty() {
        prompt.push_str(base);
        prompt.push_str("\n\n");
    }
    prompt.push_str(OUTBOUND_GUIDANCE);

    if let Some(context) = campaign_context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("\n\nCAMPAIGN CONTEXT:\n");
        prompt.push_str(context);
    }

    if let Some(knowledge) = knowledge_content.map(str::trim).filter(|k| !k.is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(knowledge);
    }

    prompt
}

/// Labelled knowledge base block, or `None` when there are no documents
pub fn knowledge_block(documents: &[KnowledgeDocument]) -> Option<String> {
    if documents.is_empty() {
        return None;
    }

    let body = documents
        .iter()
        .map(|doc| format!("### {}\n{}", doc.title, doc.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(format!(
        "KNOWLEDGE BASE:\nUse the following reference material to answer questions accurately.\n\n{}",
        body
    ))
}
