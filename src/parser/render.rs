use serde::Serialize;

use super::turn::{Role, RoleNames, Turn};

/// A turn with its role settled and its content trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTurn<'a> {
    pub role: Role,
    pub content: &'a str,
}

/// Serializable form used by the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct SpeakerLine {
    pub speaker: String,
    pub content: String,
}

/// Settle positional roles and drop turns that trim to nothing.
/// Position is counted over all turns, empty ones included.
pub fn resolve(turns: &[Turn]) -> Vec<ResolvedTurn<'_>> {
    turns
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let content = t.content.trim();
            if content.is_empty() {
                return None;
            }
            Some(ResolvedTurn {
                role: t.role.unwrap_or_else(|| Role::at(i)),
                content,
            })
        })
        .collect()
}

/// `Name: content` blocks separated by one blank line.
pub fn render(turns: &[Turn], names: &RoleNames) -> String {
    resolve(turns)
        .iter()
        .map(|t| format!("{}: {}", names.name(t.role), t.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn speaker_lines(turns: &[Turn], names: &RoleNames) -> Vec<SpeakerLine> {
    resolve(turns)
        .into_iter()
        .map(|t| SpeakerLine {
            speaker: names.name(t.role).to_string(),
            content: t.content.to_string(),
        })
        .collect()
}
