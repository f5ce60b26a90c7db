pub mod extract;
pub mod labels;
pub mod render;
pub mod segment;
pub mod turn;

use serde_json::Value;
use tracing::debug;

use crate::error::TranscriptError;
use crate::settings::Settings;
use extract::markup::{self, MarkupExtraction, MarkupOptions};
use labels::LabelPattern;
use render::SpeakerLine;
use turn::{RoleNames, Turn};

/// Pure transcript pipeline: raw text or a decoded document → role-tagged turns → `Name: content` blocks.
#[derive(Debug, Clone)]
pub struct Formatter {
    names: RoleNames,
    labels: LabelPattern,
    group_threshold: usize,
    max_depth: usize,
    min_container_chars: usize,
    min_raw_text_chars: usize,
}

impl Formatter {
    #[cfg(test)]
    pub fn new(names: RoleNames) -> Self {
        Self::with_settings(names, &Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TranscriptError> {
        let names = RoleNames::new(&settings.questioner_name, &settings.responder_name)?;
        Ok(Self::with_settings(names, settings))
    }

    fn with_settings(names: RoleNames, settings: &Settings) -> Self {
        Self {
            labels: LabelPattern::new(&names),
            names,
            group_threshold: settings.group_threshold,
            max_depth: settings.max_depth,
            min_container_chars: settings.min_container_chars,
            min_raw_text_chars: settings.min_raw_text_chars,
        }
    }

    /// Existing labels first, then paragraph gaps, then line grouping.
    pub fn segment_text(&self, text: &str) -> Result<Vec<Turn>, TranscriptError> {
        let text = text.replace("\r\n", "\n");
        let text = text.trim();
        if text.is_empty() {
            return Err(TranscriptError::EmptyInput);
        }

        if self.labels.detects(text) {
            debug!("Input carries speaker labels");
            Ok(self.labels.parse(text))
        } else {
            Ok(segment::smart_split(text, self.group_threshold))
        }
    }

    /// Turns of a decoded document. Strings are tried as encoded JSON, then as plain text.
    pub fn document_turns(&self, doc: &Value) -> Result<Vec<Turn>, TranscriptError> {
        match doc {
            Value::Object(_) | Value::Array(_) => {
                let responder = self.names.responder.to_lowercase();
                let turns = extract::extract_turns(doc, self.max_depth, &responder);
                if turns.is_empty() {
                    Err(TranscriptError::NoExtractableStructure)
                } else {
                    Ok(turns)
                }
            }
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(decoded @ (Value::Object(_) | Value::Array(_))) => {
                    self.document_turns(&decoded)
                }
                _ => self.segment_text(s),
            },
            Value::Null => Err(TranscriptError::UnsupportedInput { kind: "null" }),
            Value::Bool(_) => Err(TranscriptError::UnsupportedInput { kind: "boolean" }),
            Value::Number(_) => Err(TranscriptError::UnsupportedInput { kind: "number" }),
        }
    }

    /// Turns of a fetched or saved HTML page.
    pub fn markup_turns(&self, html: &str) -> Result<Vec<Turn>, TranscriptError> {
        if html.trim().is_empty() {
            return Err(TranscriptError::EmptyInput);
        }
        let responder = self.names.responder.to_lowercase();
        let opts = MarkupOptions {
            max_depth: self.max_depth,
            responder_name: &responder,
            min_container_chars: self.min_container_chars,
            min_raw_text_chars: self.min_raw_text_chars,
        };
        match markup::extract(html, &opts) {
            MarkupExtraction::Turns(turns) => Ok(turns),
            MarkupExtraction::RawText(text) => self.segment_text(&text),
            MarkupExtraction::Nothing => Err(TranscriptError::NoExtractableStructure),
        }
    }

    pub fn format_text(&self, text: &str) -> Result<String, TranscriptError> {
        Ok(self.render(&self.segment_text(text)?))
    }

    #[cfg(test)]
    pub fn format_document(&self, doc: &Value) -> Result<String, TranscriptError> {
        Ok(self.render(&self.document_turns(doc)?))
    }

    #[cfg(test)]
    pub fn format_markup(&self, html: &str) -> Result<String, TranscriptError> {
        Ok(self.render(&self.markup_turns(html)?))
    }

    pub fn render(&self, turns: &[Turn]) -> String {
        render::render(turns, &self.names)
    }

    pub fn speaker_lines(&self, turns: &[Turn]) -> Vec<SpeakerLine> {
        render::speaker_lines(turns, &self.names)
    }
}
