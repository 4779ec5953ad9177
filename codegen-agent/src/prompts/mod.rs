use crate::clients::{Conversation, Message, ToolCall};
use crate::config::Profile;
use crate::core::Task;
use crate::memory::Scratchpad;

const FULL_STACK_PREAMBLE: &str = "You are a full-stack development expert skilled in both backend (Node.js) and frontend (web and native) development. You are knowledgeable about all major component libraries, programming fundamentals, and relevant languages. When asked to generate code, provide complete, functional code without explanations unless specifically requested. Focus on production-quality code that follows best practices. For UI components, prioritize simplicity and clean design over complexity.";

const DESIGN_SYSTEM_PROMPT: &str = r#"You are a React expert specializing in the provided design system.

STRICT WORKFLOW (follow in order):
1. Use the get_component_metadata tool to see titles and descriptions
2. Use the select_components tool to explicitly select which components you need
3. Use get_component_docs tool ONLY for the components you selected
4. Generate the React component code

REQUIREMENTS:
- Use ONLY components from the documented design system
- NO HTML tags like <div>, <button>, <input>, etc.
- NO external component libraries
- NO StyleSheet or styles objects - use ONLY Tailwind CSS classes
- All components accept Tailwind CSS classes via the className prop
- Images should be ONLY from unsplash.com - NO local images
- Import each component individually from its own file
- Output ONLY the complete React component code, no explanations
- All generated screens or components should be SCROLLABLE, using ScrollView or a similar design system component
- All generated screens or components should be responsive and mobile-friendly, with some horizontal margin and padding
- PREFER HStack and VStack components over Box components whenever possible

OPTIMIZATION:
- Select the minimum number of components needed
- Base selection on metadata relevance to the task
- Only read full documentation for selected components

CRITICAL: You MUST generate COMPLETE and RUNNABLE code. Do not truncate or abbreviate any part of the implementation. If the component is large, focus on generating a complete, working version rather than including every possible feature."#;

pub fn system_prompt(profile: Profile) -> String {
    match profile {
        Profile::Codegen => format!(
            "{} You can access weather information for certain locations if needed.",
            FULL_STACK_PREAMBLE
        ),
        Profile::DesignSystem => DESIGN_SYSTEM_PROMPT.to_string(),
        Profile::Plain => FULL_STACK_PREAMBLE.to_string(),
    }
}

/// How the task is phrased in the user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFraming {
    #[default]
    Verbatim,
    CodeRequest,
}

impl TaskFraming {
    fn frame(self, task: &str) -> String {
        match self {
            TaskFraming::Verbatim => task.to_string(),
            TaskFraming::CodeRequest => format!("Generate code for the following request: {}", task),
        }
    }
}

/// Builds the conversation sent to the model on every think step.
///
/// Output depends only on the task and the scratchpad passed in.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptAssembler {
    system: String,
    framing: TaskFraming,
}

impl PromptAssembler {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            framing: TaskFraming::Verbatim,
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        let framing = match profile {
            Profile::Plain => TaskFraming::CodeRequest,
            Profile::Codegen | Profile::DesignSystem => TaskFraming::Verbatim,
        };
        Self::new(system_prompt(profile)).with_framing(framing)
    }

    pub fn with_framing(mut self, framing: TaskFraming) -> Self {
        self.framing = framing;
        self
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn build(&self, task: &Task, scratchpad: &Scratchpad) -> Conversation {
        let mut messages = vec![Message::user(self.framing.frame(task.as_str()))];

        for group in scratchpad.by_iteration() {
            let calls = group
                .iter()
                .map(|entry| ToolCall {
                    id: entry.call_id.clone(),
                    name: entry.tool.clone(),
                    arguments: entry.arguments.clone(),
                })
                .collect();
            messages.push(Message::assistant_tool_calls(calls));

            messages.extend(group.iter().map(|entry| {
                if entry.is_failure() {
                    Message::tool_error(entry.call_id.clone(), entry.observation_text())
                } else {
                    Message::tool_result(entry.call_id.clone(), entry.observation_text())
                }
            }));
        }

        Conversation {
            system: self.system.clone(),
            messages,
        }
    }
}
