//! Response assembler - merges a run's text and artifacts into one envelope

use crate::tools::ToolResult;

use super::message::{Document, ResponseEnvelope};

/// Used when a run produced no text at all
pub const EMPTY_REPLY: &str = "Something went wrong while processing. Please try again.";

/// Collects output as the turn loop goes
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    fragments: Vec<String>,
    images: Vec<String>,
    documents: Vec<Document>,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text fragment; blank fragments are dropped.
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.fragments.push(trimmed.to_string());
        }
    }

    /// Discard the text gathered so far in favour of `text`. Images and
    /// documents are kept.
    pub fn replace_text(&mut self, text: impl Into<String>) {
        self.fragments.clear();
        self.push_text(text);
    }

    /// Keep the images and documents a tool produced.
    pub fn collect(&mut self, result: &ToolResult) {
        self.images.extend(result.images.iter().cloned());
        self.documents.extend(result.documents.iter().cloned());
    }

    pub fn has_text(&self) -> bool {
        !self.fragments.is_empty()
    }

    pub fn finish(self) -> ResponseEnvelope {
        assemble(self.fragments, self.images, self.documents)
    }
}

/// Fragments are joined in emission order; `text` is never empty.
pub fn assemble(fragments: Vec<String>, images: Vec<String>, documents: Vec<Document>) -> ResponseEnvelope {
    let text: Vec<&str> = fragments.iter().map(|f| f.trim()).filter(|f| !f.is_empty()).collect();
    let text = if text.is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        text.join("\n\n")
    };

    ResponseEnvelope { text, images, documents }
}
