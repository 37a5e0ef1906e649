// Cross-cutting prompt fragments. Interview-specific prompts live in
// interview/prompts.rs.

/// System prompt fragment for plain-text answers with no decoration.
pub const PLAIN_TEXT_SYSTEM: &str = "You are a concise assistant. \
    Respond with plain text only. \
    Do NOT use markdown formatting. \
    Do NOT include preambles, explanations or apologies.";
