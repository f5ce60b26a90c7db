use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::turn::{Role, Turn};

static PARAGRAPH_GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static LINE_BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").unwrap());

const SENTENCE_ENDS: [char; 3] = ['.', '!', '?'];

/// Split unlabeled text on paragraph gaps, alternating roles.
/// Falls back to line grouping when the text has fewer than two paragraphs.
pub fn smart_split(text: &str, group_threshold: usize) -> Vec<Turn> {
    let chunks: Vec<&str> = PARAGRAPH_GAP_RE
        .split(text)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    if chunks.len() < 2 {
        debug!("No paragraph structure, grouping lines");
        return group_lines(text, group_threshold);
    }

    debug!("Split into {} paragraphs", chunks.len());
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| Turn::new(Role::at(i), chunk))
        .collect()
}

/// Last resort for flat line streams: accumulate lines into message-sized blocks.
pub fn group_lines(text: &str, group_threshold: usize) -> Vec<Turn> {
    let lines: Vec<&str> = LINE_BREAKS_RE
        .split(text)
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return vec![Turn::new(Role::Questioner, text)];
    }

    let mut turns = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut role = Role::Questioner;

    for (i, line) in lines.iter().copied().enumerate() {
        block.push(line);
        let joined = block.join("\n");

        let too_long = joined.chars().count() > group_threshold;
        let last = i == lines.len() - 1;
        // at least two full sentences in the block
        let complete_thought =
            line.ends_with(SENTENCE_ENDS) && joined.split(SENTENCE_ENDS).count() > 2;

        if too_long || last || complete_thought {
            turns.push(Turn::new(role, joined));
            block.clear();
            role = role.flip();
        }
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(turns: &[Turn]) -> Vec<Role> {
        turns.iter().filter_map(|t| t.role).collect()
    }

    #[test]
    fn paragraph_gaps_alternate() {
        let turns = smart_split("first\n\nsecond\n\nthird", 100);
        assert_eq!(turns.len(), 3);
        assert_eq!(
            roles(&turns),
            vec![Role::Questioner, Role::Responder, Role::Questioner]
        );
        assert_eq!(turns[2].content, "third");
    }

    #[test]
    fn whitespace_only_lines_count_as_gaps() {
        let turns = smart_split("question?\n   \n\t\nanswer.", 100);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "answer.");
    }

    #[test]
    fn single_paragraph_falls_through_to_grouper() {
        let turns = smart_split("Hello there.\nHow are you? Fine.\nGood to hear", 100);
        // second line closes the first block: ends with '.' and holds 3 sentences
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "Hello there.\nHow are you? Fine.");
        assert_eq!(turns[1].content, "Good to hear");
        assert_eq!(roles(&turns), vec![Role::Questioner, Role::Responder]);
    }

    #[test]
    fn long_line_without_punctuation_is_one_turn() {
        let line = "a".repeat(150);
        let turns = group_lines(&line, 100);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, line);
        assert_eq!(turns[0].role, Some(Role::Questioner));
    }

    #[test]
    fn length_threshold_closes_blocks() {
        let a = "x".repeat(60);
        let b = "y".repeat(60);
        let c = "z".repeat(10);
        let turns = group_lines(&format!("{a}\n{b}\n{c}"), 100);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, format!("{a}\n{b}"));
        assert_eq!(turns[1].content, c);
    }

    #[test]
    fn single_sentence_does_not_close_block() {
        let turns = group_lines("Is it done?\nyes\nok", 100);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "Is it done?\nyes\nok");
    }

    #[test]
    fn never_empty_for_non_blank_input() {
        for input in ["x", "one\ntwo", " \n y \n", "...\n!!!"] {
            assert!(!group_lines(input, 100).is_empty(), "empty for {:?}", input);
        }
    }

    #[test]
    fn blank_input_yields_single_questioner_turn() {
        let turns = group_lines("\n\n", 100);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Some(Role::Questioner));
    }
}
