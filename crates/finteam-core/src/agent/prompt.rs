use crate::agent::{AgentDescriptor, Team};
use crate::constants::tool_names::TRANSFER_PREFIX;
use crate::tools::tool_names_for_binding;
use std::collections::HashSet;

/// Builds the system prompt an agent loop starts from.
#[derive(Debug, Default)]
pub struct SystemPromptBuilder {
    name: Option<String>,
    role: Option<String>,
    instructions: Vec<String>,
    markdown: bool,
    members: Vec<MemberSummary>,
}

#[derive(Debug)]
struct MemberSummary {
    name: String,
    role: String,
    transfer_tool: String,
    tools: Vec<&'static str>,
}

impl SystemPromptBuilder {
    pub fn for_agent(agent: &AgentDescriptor) -> Self {
        Self {
            name: Some(agent.name().to_string()),
            role: non_empty(agent.role()),
            instructions: agent.instructions().to_vec(),
            markdown: agent.markdown(),
            members: Vec::new(),
        }
    }

    pub fn for_team(team: &Team) -> Self {
        let members = team
            .members()
            .iter()
            .zip(transfer_tool_names(team.members()))
            .map(|(member, transfer_tool)| MemberSummary {
                name: member.name().to_string(),
                role: member.role().to_string(),
                transfer_tool,
                tools: member.tools().iter().flat_map(tool_names_for_binding).collect(),
            })
            .collect();

        Self {
            name: Some(team.name().to_string()),
            role: non_empty(team.role()),
            instructions: team.instructions().to_vec(),
            markdown: team.markdown(),
            members,
        }
    }

    pub fn build(&self) -> String {
        let mut prompt = String::new();

        if let Some(ref name) = self.name {
            prompt.push_str(&format!("You are {name}.\n"));
        }
        if let Some(ref role) = self.role {
            prompt.push_str(&format!("Your role: {role}\n"));
        }

        if !self.members.is_empty() {
            prompt.push_str(TEAM_LEADER_PROMPT);
            prompt.push_str("\n## Team members\n");
            for member in &self.members {
                prompt.push_str(&format!("- {}", member.name));
                if !member.role.is_empty() {
                    prompt.push_str(&format!(": {}", member.role));
                }
                prompt.push_str(&format!("\n  Transfer with: {}\n", member.transfer_tool));
                if !member.tools.is_empty() {
                    prompt.push_str(&format!("  Member tools: {}\n", member.tools.join(", ")));
                }
            }
        }

        let mut rules: Vec<&str> = self.instructions.iter().map(String::as_str).collect();
        if self.markdown {
            rules.push("Use markdown to format your answers.");
        }
        if !rules.is_empty() {
            prompt.push_str("\n## Instructions\n");
            for rule in rules {
                prompt.push_str(&format!("- {rule}\n"));
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Transfer tool names for `members`, in member order.
///
/// Names are unique within the list: a member whose name has no
/// identifier characters becomes `member_<position>`, and keys that
/// collide get a numeric suffix.
pub fn transfer_tool_names(members: &[AgentDescriptor]) -> Vec<String> {
    let mut taken = HashSet::new();
    members
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let key = member.key();
            let base = if key.is_empty() {
                format!("member_{}", i + 1)
            } else {
                key
            };
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            format!("{TRANSFER_PREFIX}{candidate}")
        })
        .collect()
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

const TEAM_LEADER_PROMPT: &str = r#"
You lead a team of agents. Answer directly when you can; otherwise transfer
work to the member whose tools fit the task.
- When transferring, give a self-contained task description and the output you expect.
- Check every member result before using it; re-assign the task if it is incomplete.
- Combine member results into one answer for the user.
"#;
