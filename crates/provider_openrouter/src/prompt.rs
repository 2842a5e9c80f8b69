use core_types::{CONTEXT_WINDOW, ChatRole, ChatTurn, Language};

pub fn language_instruction(language: Language) -> &'static str {
    match language {
        Language::En => "Respond in English",
        Language::Hi => "Respond in Hindi (हिंदी)",
        Language::Mr => "Respond in Marathi (मराठी)",
        Language::Te => "Respond in Telugu (తెలుగు)",
        Language::Ta => "Respond in Tamil (தமிழ்)",
    }
}

pub fn system_prompt(language: Language, grounding: &str) -> String {
    format!(
        "You are a helpful campus multilingual assistant for a college/university. \
Your primary role is to help students, faculty, and staff with campus-related queries.

IMPORTANT INSTRUCTIONS:
1. {instruction}
2. Use the knowledge base provided below to answer questions accurately
3. If you don't find the exact answer in the knowledge base, provide helpful general guidance
4. Be concise but comprehensive in your responses
5. Always maintain a friendly and professional tone
6. If asked about topics not related to campus/education, politely redirect to campus-related topics

KNOWLEDGE BASE:
{grounding}

Remember to search through the knowledge base thoroughly before responding. \
If the information isn't available, say so and offer to help with related campus topics.",
        instruction = language_instruction(language),
    )
}

/// System instruction, then at most [`CONTEXT_WINDOW`] history turns in order, then the user turn.
pub fn build_messages(
    language: Language,
    grounding: &str,
    history: &[ChatTurn],
    user_text: &str,
) -> Vec<ChatTurn> {
    let recent = &history[history.len().saturating_sub(CONTEXT_WINDOW)..];
    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatTurn::new(
        ChatRole::System,
        system_prompt(language, grounding),
    ));
    messages.extend(recent.iter().cloned());
    messages.push(ChatTurn::new(ChatRole::User, user_text));
    messages
}
