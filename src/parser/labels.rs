use regex::Regex;

use super::turn::{Role, RoleNames, Turn};

/// Labels recognized regardless of the configured role names.
const BUILTIN_LABELS: &[&str] = &["You", "User", "Assistant"];

/// Tokens that mark a built-in label as the Questioner's.
const QUESTIONER_TOKENS: &[&str] = &["you", "user"];

/// Line-anchored speaker prefix. Detection and splitting share this one regex.
#[derive(Debug, Clone)]
pub struct LabelPattern {
    re: Regex,
    questioner: String,
    responder: String,
}

impl LabelPattern {
    pub fn new(names: &RoleNames) -> Self {
        let mut vocab: Vec<&str> = Vec::new();
        for label in BUILTIN_LABELS
            .iter()
            .copied()
            .chain([names.questioner.as_str(), names.responder.as_str()])
        {
            if !vocab.iter().any(|v| v.eq_ignore_ascii_case(label)) {
                vocab.push(label);
            }
        }
        let alternation = vocab
            .iter()
            .map(|l| regex::escape(l))
            .collect::<Vec<_>>()
            .join("|");
        // Escaped literals only, so this cannot fail.
        let re = Regex::new(&format!(r"(?im)^({}):[ \t]*", alternation))
            .expect("label alternation is always a valid regex");

        Self {
            re,
            questioner: names.questioner.to_lowercase(),
            responder: names.responder.to_lowercase(),
        }
    }

    pub fn detects(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// Split at every label. Text before the first label is dropped, label order is kept as-is.
    pub fn parse(&self, text: &str) -> Vec<Turn> {
        let matches: Vec<_> = self.re.captures_iter(text).collect();
        let mut turns = Vec::with_capacity(matches.len());

        for (i, caps) in matches.iter().enumerate() {
            let whole = caps.get(0).expect("group 0 always participates");
            let end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());
            let role = self.classify(&caps[1]);
            turns.push(Turn::new(role, text[whole.end()..end].trim()));
        }

        turns
    }

    /// Configured names win over the built-in synonyms, so a name that contains
    /// another name or a synonym still maps back to its own role.
    fn classify(&self, token: &str) -> Role {
        let lower = token.to_lowercase();
        if lower == self.questioner {
            Role::Questioner
        } else if lower == self.responder {
            Role::Responder
        } else if QUESTIONER_TOKENS.iter().any(|t| lower.contains(t)) {
            Role::Questioner
        } else {
            Role::Responder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> LabelPattern {
        LabelPattern::new(&RoleNames::new("Darko", "Claude").unwrap())
    }

    fn roles(turns: &[Turn]) -> Vec<Role> {
        turns.iter().filter_map(|t| t.role).collect()
    }

    #[test]
    fn detects_line_start_labels_case_insensitively() {
        let p = pattern();
        assert!(p.detects("user: hi"));
        assert!(p.detects("intro line\nCLAUDE: hello"));
        assert!(p.detects("Darko: question"));
    }

    #[test]
    fn ignores_mid_sentence_labels() {
        let p = pattern();
        assert!(!p.detects("I asked the Assistant: what now?"));
        assert!(!p.detects("Your account: locked"));
        assert!(!p.detects("plain text\n\nwith paragraphs"));
    }

    #[test]
    fn splits_and_maps_synonyms() {
        let turns = pattern().parse("You: hi\nAssistant: hello there\nDarko: bye\nClaude: ciao");
        assert_eq!(turns.len(), 4);
        assert_eq!(
            roles(&turns),
            vec![Role::Questioner, Role::Responder, Role::Questioner, Role::Responder]
        );
        assert_eq!(turns[1].content, "hello there");
    }

    #[test]
    fn multiline_content_stays_in_one_turn() {
        let turns = pattern().parse("User: line one\nline two\n\nClaude: answer");
        assert_eq!(turns[0].content, "line one\nline two");
        assert_eq!(turns[1].content, "answer");
    }

    #[test]
    fn preamble_is_dropped() {
        let turns = pattern().parse("Shared conversation\nUser: hi\nClaude: hello");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hi");
    }

    #[test]
    fn out_of_order_labels_are_preserved() {
        let turns = pattern().parse("User: one\nUser: two\nClaude: three");
        assert_eq!(
            roles(&turns),
            vec![Role::Questioner, Role::Questioner, Role::Responder]
        );
    }

    #[test]
    fn empty_segment_keeps_empty_content() {
        let turns = pattern().parse("User:\nClaude: hello");
        assert_eq!(turns.len(), 2);
        assert!(turns[0].content.is_empty());
    }

    #[test]
    fn overlapping_names_keep_their_roles() {
        for (q, r) in [("Ann", "Joanna"), ("Darko", "Bayou"), ("Human", "Superuser")] {
            let p = LabelPattern::new(&RoleNames::new(q, r).unwrap());
            let turns = p.parse(&format!("{}: first\n{}: second\nUser: third", q, r));
            assert_eq!(
                roles(&turns),
                vec![Role::Questioner, Role::Responder, Role::Questioner],
                "names {}/{}",
                q,
                r
            );
        }
    }

    #[test]
    fn responder_named_like_a_synonym() {
        let p = LabelPattern::new(&RoleNames::new("Darko", "User").unwrap());
        let turns = p.parse("Darko: hi\nUser: hello\nYou: again");
        assert_eq!(
            roles(&turns),
            vec![Role::Questioner, Role::Responder, Role::Questioner]
        );
    }

    #[test]
    fn default_names_share_builtin_vocabulary() {
        let p = LabelPattern::new(&RoleNames::default());
        let turns = p.parse("User: a\nAssistant: b");
        assert_eq!(roles(&turns), vec![Role::Questioner, Role::Responder]);
    }
}
