// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt text for replies, summaries, and sentiment scoring.

use leadline_core::{Identity, Message, Role};
use leadline_knowledge::RetrievedChunk;
use tracing::{info, warn};

/// Instruction used when neither a prompt file nor an inline prompt is set.
pub fn default_instruction(agent_name: &str) -> String {
    format!(
        "You are {agent_name}, a polite assistant that turns enquiries into qualified leads.\n\
         Hold a natural conversation and ask relevant questions to learn what the person needs, \
         where they are, and how they would like to be served.\n\
         Answer questions using the business information provided. If the answer is not there, \
         say you will check and follow up rather than guessing.\n\
         If the user declines a question, politely ask for an alternative detail.\n\
         If the user asks you to stop, end the conversation politely.\n\
         If the user only says \"Hi\" or \"Hello\", greet them and ask how you can help. \
         Do not ask for lead details or describe any service in that first reply."
    )
}

/// Resolves the system instruction: file > inline > default.
pub async fn load_instruction(
    agent_name: &str,
    inline_prompt: &Option<String>,
    prompt_file: &Option<String>,
) -> String {
    if let Some(file_path) = prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim().to_string();
                if !trimmed.is_empty() {
                    info!(path = %file_path, "loaded system prompt from file");
                    return trimmed;
                }
            }
            Err(e) => {
                warn!(
                    path = %file_path,
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(prompt) = inline_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    default_instruction(agent_name)
}

/// The single system message that leads every reply request.
pub fn system_message(instruction: &str, identity: &Identity, context: &[RetrievedChunk]) -> String {
    let mut out = String::with_capacity(instruction.len() + 256);
    out.push_str(instruction);
    out.push_str("\n\nYou are speaking with ");
    out.push_str(&identity.display_name);
    out.push_str(", mobile ");
    out.push_str(&identity.user_id);
    out.push('.');

    if !context.is_empty() {
        out.push_str("\n\nRelevant business information:\n");
        for (i, hit) in context.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", i + 1, hit.chunk.text));
        }
    }
    out
}

/// `User:` / `AI:` transcript, one line per message. System messages are left out.
pub fn transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        let speaker = match message.role() {
            Role::User => "User",
            Role::Assistant => "AI",
            Role::System => continue,
        };
        out.push_str(speaker);
        out.push_str(": ");
        out.push_str(message.content());
        out.push('\n');
    }
    out
}

pub fn summary_prompt(transcript: &str, display_name: &str, mobile_number: &str) -> String {
    format!(
        "You are a helpful assistant. Summarize the lead details from the conversation below \
         clearly and concisely for a sales team. Include what the person is interested in and \
         any details they shared.\n\n\
         Name: {display_name}\n\
         Mobile: {mobile_number}\n\n\
         Conversation:\n{transcript}\n\
         Summary:"
    )
}

pub fn sentiment_prompt(summary: &str) -> String {
    format!(
        "Analyze the conversation summary and return ONLY a JSON object with these keys:\n\
         {{\"sentiment_label\": \"Positive\" | \"Neutral\" | \"Negative\", \"sentiment_score\": <number from -1.0 to 1.0>}}\n\
         Do not include any other text.\n\n\
         Summary:\n{summary}"
    )
}
