use crate::error::TranscriptError;

/// The two participants of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Questioner,
    Responder,
}

impl Role {
    /// Strict alternation, Questioner first.
    pub fn at(index: usize) -> Self {
        if index % 2 == 0 {
            Role::Questioner
        } else {
            Role::Responder
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Role::Questioner => Role::Responder,
            Role::Responder => Role::Questioner,
        }
    }
}

/// One contiguous block of dialogue. `role: None` means "resolve by position".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Option<Role>,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            content: content.into(),
        }
    }

    pub fn unlabeled(content: impl Into<String>) -> Self {
        Self {
            role: None,
            content: content.into(),
        }
    }
}

/// Display names of the two roles. They double as recognized labels.
#[derive(Debug, Clone)]
pub struct RoleNames {
    pub questioner: String,
    pub responder: String,
}

impl RoleNames {
    pub fn new(questioner: &str, responder: &str) -> Result<Self, TranscriptError> {
        let questioner = questioner.trim();
        let responder = responder.trim();
        if questioner.is_empty() || responder.is_empty() {
            return Err(TranscriptError::InvalidRoleNames(
                "role names must not be empty".to_string(),
            ));
        }
        if questioner.eq_ignore_ascii_case(responder) {
            return Err(TranscriptError::InvalidRoleNames(format!(
                "both roles are named {:?}",
                questioner
            )));
        }
        Ok(Self {
            questioner: questioner.to_string(),
            responder: responder.to_string(),
        })
    }

    pub fn name(&self, role: Role) -> &str {
        match role {
            Role::Questioner => &self.questioner,
            Role::Responder => &self.responder,
        }
    }
}

impl Default for RoleNames {
    fn default() -> Self {
        Self {
            questioner: "User".to_string(),
            responder: "Assistant".to_string(),
        }
    }
}
