// Cross-cutting prompt fragments sent with every completion.
// Per-fragment templates live in crate::prompts.

/// System prompt scoping the model to highlight drafting.
pub const SYSTEM_SCOPE: &str = "You are a science communicator drafting research highlights \
    for a government research program. Write for a general audience. \
    Use only information present in the publication text you are given. \
    Do NOT invent results, numbers, institutions, or names. \
    Return only the requested text, without preamble or commentary.";

/// Prefix of the format instructions for list-shaped output.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Separator between format instructions and the formatted user prompt.
pub const USER_REQUEST_SEPARATOR: &str = "\nUser Request:\n";
