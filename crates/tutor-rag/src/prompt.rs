use tutor_core::types::{ConversationTurn, GenerationRequest};

use crate::context::ContextBlock;

/// Answer given when the retrieved context does not support a training answer.
pub const REFUSAL: &str = "I'm sorry, I don't have that information in the training materials.";

/// Grounding policy sent as the system instruction of every answer.
pub const SYSTEM_PROMPT: &str = "You are a training assistant for company staff. \
Answer training questions using only the information in the CONTEXT section. \
If the CONTEXT does not contain the answer, reply exactly with: \
I'm sorry, I don't have that information in the training materials. \
Do not use outside knowledge and do not guess. \
Greetings, thanks and other small talk do not need the CONTEXT; answer them briefly and naturally. \
Your reply will be read aloud, so write plain conversational sentences: \
no lists, no bullet points, no headings, no markdown and no citation markers.";

/// Joins the three prompt sections: retrieved context, prior turns, and the
/// current message.
pub fn build_prompt(context: &ContextBlock, history: &[ConversationTurn], message: &str) -> String {
    let conversation = history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!("CONTEXT:\n{context}\n\nCONVERSATION SO FAR:\n{conversation}\n\nUSER: {message}")
}

pub fn answer_request(context: &ContextBlock, history: &[ConversationTurn], message: &str) -> GenerationRequest {
    GenerationRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt: build_prompt(context, history, message),
        temperature: None,
    }
}
