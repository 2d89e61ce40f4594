use crate::llm::{Message, ToolCall};

/// Messages exchanged during one agent run. Lives only as long as the run.
#[derive(Debug, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    system_prompt: Option<String>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.is_empty()).then_some(prompt);
        self
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn add_tool_calls(&mut self, content: impl Into<String>, calls: Vec<ToolCall>) {
        self.messages.push(Message::assistant_with_tools(content, calls));
    }

    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, result: impl Into<String>) {
        self.messages.push(Message::tool_result(tool_call_id, result));
    }

    /// All messages, the system prompt first.
    pub fn get_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(ref system) = self.system_prompt {
            messages.push(Message::system(system));
        }
        messages.extend(self.messages.iter().cloned());
        messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Rough size of the conversation, about four bytes per token.
    pub fn estimate_tokens(&self) -> usize {
        self.system_prompt.as_deref().map_or(0, str::len) / 4
            + self.messages.iter().map(|m| m.content.len() / 4).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_system_prompt_comes_first() {
        let mut history = ConversationHistory::new().with_system_prompt("You are Web Agent.");
        history.add_user_message("test");
        history.add_tool_calls("", vec![ToolCall::function("call_1", "duckduckgo_search", "{}")]);
        history.add_tool_result("call_1", "[]");

        let messages = history.get_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(history.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert!(history.estimate_tokens() > 0);
    }

    #[test]
    fn test_empty_prompt_is_omitted() {
        let mut history = ConversationHistory::new().with_system_prompt("");
        assert!(history.is_empty());
        assert_eq!(history.estimate_tokens(), 0);

        history.add_assistant_message("done");
        assert_eq!(history.get_messages()[0].role, Role::Assistant);
    }
}
