//! Guided-collection flow agent.
//!
//! Walks the user through providing {name, email, technology} via a
//! tool-call contract, confirms collection, then deterministically renders a
//! social-media post from a fixed template.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, Role, ToolSpec};

const DEFAULT_MAX_STEPS: usize = 8;

pub const PROFILE_TOOL_NAME: &str = "user_profile";
pub const PROFILE_COLLECTED_ACK: &str = "User profile collected successfully!";

pub const COLLECTION_PROMPT: &str = "\
You are a helpful chatbot that guides a user step by step to create a LinkedIn post.

You must collect the following information:
1. Name
2. Valid Email address
3. Technology they are working on

Rules:
- Validate each input before moving to the next step.
- If the email is not valid, ask politely for correction.
- If the technology is vague or unknown, ask for clarification or suggest alternatives.
- Once you have all details, call the `user_profile` tool with {name, email, technology}.
- Do not guess missing values. Always confirm with the user.";

/// Collected user information. Constructed only from a validated
/// `user_profile` tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub technology: String,
}

impl UserProfile {
    pub fn from_arguments(arguments: &Value) -> Result<Self, ApiError> {
        let profile: UserProfile = serde_json::from_value(arguments.clone()).map_err(|err| {
            ApiError::BadRequest(format!("Malformed user profile arguments: {}", err))
        })?;

        if profile.name.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Collected profile has an empty name".to_string(),
            ));
        }
        if !email_regex().is_match(profile.email.trim()) {
            return Err(ApiError::BadRequest(format!(
                "Collected profile has an invalid email address: '{}'",
                profile.email
            )));
        }
        if profile.technology.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Collected profile has an empty technology".to_string(),
            ));
        }

        Ok(profile)
    }

    pub fn render_post(&self) -> String {
        format!(
            "🚀 Exciting Update!\n\n\
             Hi everyone, I'm {} and currently working with {}.\n\
             If you'd like to connect or collaborate, feel free to reach out at {}.\n\n\
             #CareerGrowth #LinkedIn #Technology #Innovation",
            self.name.trim(),
            self.technology.trim(),
            self.email.trim()
        )
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

pub fn profile_tool_spec() -> ToolSpec {
    ToolSpec {
        name: PROFILE_TOOL_NAME.to_string(),
        description: "Submit the collected user information for LinkedIn post generation."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string" },
                "technology": { "type": "string" }
            },
            "required": ["name", "email", "technology"]
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Collecting,
    Confirming,
    Generating,
    Done,
}

/// Deterministic routing after a model turn. No LLM involved.
///
/// The `Done` branch ends the turn only; the conversation resumes in
/// `Collecting` when the next user message arrives.
pub fn route_after_collecting(messages: &[ChatMessage]) -> FlowState {
    match messages.last() {
        Some(last) if last.is_assistant() && last.has_tool_calls() => FlowState::Confirming,
        Some(last) if last.role != Role::User => FlowState::Done,
        _ => FlowState::Collecting,
    }
}

pub struct FlowAgent {
    provider: Arc<dyn LlmProvider>,
    max_steps: usize,
}

impl FlowAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub async fn run_turn(&self, history: &mut Vec<ChatMessage>) -> Result<(), ApiError> {
        let mut state = FlowState::Collecting;
        let mut pending_profile: Option<UserProfile> = None;
        let mut step = 0usize;

        loop {
            if step >= self.max_steps {
                return Err(ApiError::Internal(format!(
                    "Flow agent exceeded maximum steps ({})",
                    self.max_steps
                )));
            }
            step += 1;

            match state {
                FlowState::Collecting => {
                    let mut messages = vec![ChatMessage::system(COLLECTION_PROMPT)];
                    messages.extend(history.iter().cloned());

                    let reply = self
                        .provider
                        .complete(ChatRequest::new(messages).with_tools(vec![profile_tool_spec()]))
                        .await?;
                    history.push(reply);
                    state = route_after_collecting(history);
                }
                FlowState::Confirming => {
                    let call = history
                        .last()
                        .filter(|msg| msg.is_assistant())
                        .and_then(|msg| msg.tool_calls.first())
                        .cloned()
                        .ok_or_else(|| {
                            ApiError::InternalConsistency(
                                "Confirming without a pending tool call".to_string(),
                            )
                        })?;

                    // Validate before acknowledging. A rejected profile must
                    // leave no trace in the transcript, so the tool-call
                    // message is dropped along with the turn.
                    let profile = match UserProfile::from_arguments(&call.arguments) {
                        Ok(profile) => profile,
                        Err(err) => {
                            history.pop();
                            return Err(err);
                        }
                    };

                    history.push(ChatMessage::tool(PROFILE_COLLECTED_ACK, call.id));
                    pending_profile = Some(profile);
                    state = FlowState::Generating;
                }
                FlowState::Generating => {
                    let profile = pending_profile.take().ok_or_else(|| {
                        ApiError::InternalConsistency(
                            "Generation reached without a collected profile".to_string(),
                        )
                    })?;
                    history.push(ChatMessage::assistant(profile.render_post()));
                    state = FlowState::Done;
                }
                FlowState::Done => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::final_reply;
    use crate::graph::testing::ScriptedProvider;
    use crate::llm::ToolCallRequest;

    fn profile_call(id: &str, name: &str, email: &str, technology: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: PROFILE_TOOL_NAME.to_string(),
            arguments: json!({
                "name": name,
                "email": email,
                "technology": technology,
            }),
        }
    }

    #[tokio::test]
    async fn clarifying_question_ends_the_turn_in_collecting() {
        let provider = Arc::new(ScriptedProvider::new(vec![ChatMessage::assistant(
            "Hi! What's your name?",
        )]));
        let agent = FlowAgent::new(provider);

        let mut history = vec![ChatMessage::user("Hi")];
        agent.run_turn(&mut history).await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(final_reply(&history), "Hi! What's your name?");
        assert!(history.iter().all(|msg| msg.role != Role::Tool));
    }

    #[tokio::test]
    async fn complete_profile_renders_the_post() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ChatMessage::assistant("Hi! What's your name?"),
            ChatMessage::assistant_with_tool_calls(
                "",
                vec![profile_call("call_1", "Ana", "ana@x.com", "Rust")],
            ),
        ]));
        let agent = FlowAgent::new(provider);

        let mut history = vec![ChatMessage::user("Hi")];
        agent.run_turn(&mut history).await.unwrap();

        history.push(ChatMessage::user(
            "My name is Ana, email ana@x.com, I work with Rust",
        ));
        agent.run_turn(&mut history).await.unwrap();

        let post = final_reply(&history);
        assert!(post.contains("Ana"));
        assert!(post.contains("Rust"));
        assert!(post.contains("ana@x.com"));

        // The confirmation tool message is correlated to the profile call.
        let ack = history
            .iter()
            .find(|msg| msg.role == Role::Tool)
            .expect("confirmation message present");
        assert_eq!(ack.content, PROFILE_COLLECTED_ACK);
        assert_eq!(ack.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn invalid_email_in_tool_call_is_rejected() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ChatMessage::assistant_with_tool_calls(
                "",
                vec![profile_call("call_1", "Ana", "not-an-email", "Rust")],
            ),
        ]));
        let agent = FlowAgent::new(provider);

        let mut history = vec![ChatMessage::user("Ana, not-an-email, Rust")];
        let err = agent.run_turn(&mut history).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        // The failed turn leaves only the user message behind: no success
        // acknowledgement and no dangling tool call for the next turn's
        // model to see.
        assert_eq!(history.len(), 1);
        assert!(history.iter().all(|msg| msg.role != Role::Tool));
        assert!(history.iter().all(|msg| !msg.has_tool_calls()));
    }

    #[test]
    fn routing_is_deterministic_over_the_message_list() {
        let with_tool_call = vec![ChatMessage::assistant_with_tool_calls(
            "",
            vec![profile_call("call_1", "Ana", "ana@x.com", "Rust")],
        )];
        assert_eq!(route_after_collecting(&with_tool_call), FlowState::Confirming);

        let plain_reply = vec![ChatMessage::assistant("What's your email?")];
        assert_eq!(route_after_collecting(&plain_reply), FlowState::Done);

        let awaiting_model = vec![ChatMessage::user("Hi")];
        assert_eq!(route_after_collecting(&awaiting_model), FlowState::Collecting);
    }

    #[tokio::test]
    async fn rejected_profile_does_not_corrupt_later_turns() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ChatMessage::assistant_with_tool_calls(
                "",
                vec![profile_call("call_1", "Ana", "not-an-email", "Rust")],
            ),
            ChatMessage::assistant_with_tool_calls(
                "",
                vec![profile_call("call_2", "Ana", "ana@x.com", "Rust")],
            ),
        ]));
        let agent = FlowAgent::new(provider);

        let mut history = vec![ChatMessage::user("Ana, not-an-email, Rust")];
        agent.run_turn(&mut history).await.unwrap_err();

        // A corrected follow-up runs against the clean transcript and
        // completes normally.
        history.push(ChatMessage::user("Sorry, it's ana@x.com"));
        agent.run_turn(&mut history).await.unwrap();

        let ack = history
            .iter()
            .find(|msg| msg.role == Role::Tool)
            .expect("confirmation message present");
        assert_eq!(ack.content, PROFILE_COLLECTED_ACK);
        assert_eq!(ack.tool_call_id.as_deref(), Some("call_2"));
        assert!(final_reply(&history).contains("ana@x.com"));
    }

    #[test]
    fn profile_validation_rejects_blank_name() {
        let err = UserProfile::from_arguments(&json!({
            "name": "  ",
            "email": "ana@x.com",
            "technology": "Rust",
        }))
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn rendered_post_contains_all_fields() {
        let profile = UserProfile {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            technology: "Rust".to_string(),
        };
        let post = profile.render_post();
        assert!(post.contains("I'm Ana"));
        assert!(post.contains("working with Rust"));
        assert!(post.contains("reach out at ana@x.com"));
    }
}
