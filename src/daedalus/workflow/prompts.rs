// SPDX-License-Identifier: MIT

//! Prompt templates for the workflow's agents.
//!
//! - SCOPE_SYSTEM_PROMPT: reasoner persona that writes the scope document
//! - CODER_SYSTEM_PROMPT: builds and refines the agent, scope appended per call
//! - ROUTER_SYSTEM_PROMPT: classification only
//! - CLOSER_SYSTEM_PROMPT: execution instructions and goodbye

/// Reasoner persona.
pub const SCOPE_SYSTEM_PROMPT: &str = "\
You are an expert at engineering AI agents with deep knowledge of Pydantic AI and creating a \
detailed scope document including architecture diagrams, core components, dependencies, and \
testing strategy. Base your answer on user requests and available documentation.";

/// Coder persona.
pub const CODER_SYSTEM_PROMPT: &str = "\
You are an expert AI agent developer. Build the agent the user asked for, following the scope \
document below. On every turn respond by coding, refining or clarifying based on your prior \
output and the user's latest feedback. Always return complete, runnable code: the agent, its \
tools, its prompts and an example of how to run it.";

/// Router persona.
pub const ROUTER_SYSTEM_PROMPT: &str = "\
Your job is to decide whether user wants to 'finish_conversation' or continue 'coder_agent' \
based on their message.";

/// Closer persona.
pub const CLOSER_SYSTEM_PROMPT: &str = "\
Your job is to end the conversation of creating an AI agent providing execution instruction of \
the agent and then wrap it with a polite goodbye.";

/// Sections every scope document must cover.
pub const SCOPE_SECTIONS: [&str; 4] = [
    "Architecture diagram",
    "Core components",
    "External dependencies",
    "Testing Strategy",
];

/// Prompt for the scope document.
pub fn build_scope_prompt(user_request: &str, documentation_pages: &[String]) -> String {
    let sections: String = SCOPE_SECTIONS
        .iter()
        .map(|s| format!("- {s}\n"))
        .collect();

    format!(
        "User AI Agent Request: {user_request}\n\n\
         Create a detailed scope document for the AI agent following the given guidelines:\n\
         {sections}\n\
         Consider the available documentation pages as well:\n\
         {pages}\n\n\
         Include a relevant list of documentation pages that can be used in building the agent.",
        pages = documentation_pages.join("\n"),
    )
}

/// Scope rendered as extra context for the coder's system prompt.
pub fn build_scope_context(scope: &str) -> String {
    format!("Scope document:\n{scope}")
}

/// Prompt for the routing decision.
pub fn build_router_prompt(user_message: &str) -> String {
    format!(
        "User sent the message:\n{user_message}\n\n\
         Respond *only* with:\n\
         - \"finish_conversation\" if user wants to end conversation\n\
         - \"coder_agent\" if user wants to continue building agent"
    )
}
