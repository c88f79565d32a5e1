//! Instruction templates and the static action table.
//!
//! Every action kind maps to one [`ActionEntry`]: the builder that wraps user text
//! into an instruction, where the reply is delivered, and where the input comes from.

use serde::{Deserialize, Serialize};
use std::fmt;

const NO_COMMENTARY: &str = "Return only the resulting text, with no commentary, preamble, or explanations.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStyle {
    Formal,
    Informal,
    Business,
    Creative,
    Academic,
    Neutral,
}

impl RewriteStyle {
    /// Unknown labels fall back to [`RewriteStyle::Neutral`].
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "formal" => RewriteStyle::Formal,
            "informal" => RewriteStyle::Informal,
            "business" => RewriteStyle::Business,
            "creative" => RewriteStyle::Creative,
            "academic" => RewriteStyle::Academic,
            _ => RewriteStyle::Neutral,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            RewriteStyle::Formal => "a formal, official",
            RewriteStyle::Informal => "an informal, friendly",
            RewriteStyle::Business => "a business, professional",
            RewriteStyle::Creative => "a creative, expressive",
            RewriteStyle::Academic => "an academic, scholarly",
            RewriteStyle::Neutral => "a neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Letter,
    Resume,
    Contract,
    Report,
    Article,
    Generic,
}

impl DocumentType {
    /// Unknown labels fall back to [`DocumentType::Generic`].
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "letter" => DocumentType::Letter,
            "resume" => DocumentType::Resume,
            "contract" => DocumentType::Contract,
            "report" => DocumentType::Report,
            "article" => DocumentType::Article,
            _ => DocumentType::Generic,
        }
    }

    fn label(self) -> &'static str {
        match self {
            DocumentType::Letter => "business letter",
            DocumentType::Resume => "resume",
            DocumentType::Contract => "contract",
            DocumentType::Report => "report",
            DocumentType::Article => "article",
            DocumentType::Generic => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    Improve,
    Rewrite { style: RewriteStyle },
    Continue,
    FixGrammar,
    Shorten,
    Expand,
    Translate { target_language: String },
    Summarize,
    SuggestHeadlines,
    GenerateDocument { doc_type: DocumentType },
    AnswerQuestion { context: String },
    Chat,
}

/// Fieldless key into [`ACTION_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTag {
    Improve,
    Rewrite,
    Continue,
    FixGrammar,
    Shorten,
    Expand,
    Translate,
    Summarize,
    SuggestHeadlines,
    GenerateDocument,
    AnswerQuestion,
    Chat,
}

/// Where a successful reply lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Appended to the conversation log.
    Conversation,
    /// Replaces the captured input range.
    Substitute,
    /// Replaces the whole document.
    ReplaceDocument,
}

/// Where the controller reads the action input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputScope {
    SelectionOnly,
    SelectionOrDocument,
    /// Typed by the user; not tied to any document range.
    Provided,
}

pub type InstructionBuilder = fn(&ActionKind, &str) -> String;

pub struct ActionEntry {
    pub tag: ActionTag,
    pub name: &'static str,
    pub build: InstructionBuilder,
    pub destination: Destination,
    pub scope: InputScope,
    pub busy_message: &'static str,
}

pub static ACTION_TABLE: [ActionEntry; 12] = [
    ActionEntry {
        tag: ActionTag::Improve,
        name: "improve",
        build: build_improve,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOnly,
        busy_message: "Processing text...",
    },
    ActionEntry {
        tag: ActionTag::Rewrite,
        name: "rewrite",
        build: build_rewrite,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOnly,
        busy_message: "Rewriting text...",
    },
    ActionEntry {
        tag: ActionTag::Continue,
        name: "continue",
        build: build_continue,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOrDocument,
        busy_message: "Continuing text...",
    },
    ActionEntry {
        tag: ActionTag::FixGrammar,
        name: "grammar",
        build: build_fix_grammar,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOnly,
        busy_message: "Fixing grammar...",
    },
    ActionEntry {
        tag: ActionTag::Shorten,
        name: "shorten",
        build: build_shorten,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOnly,
        busy_message: "Shortening text...",
    },
    ActionEntry {
        tag: ActionTag::Expand,
        name: "expand",
        build: build_expand,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOnly,
        busy_message: "Expanding text...",
    },
    ActionEntry {
        tag: ActionTag::Translate,
        name: "translate",
        build: build_translate,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOrDocument,
        busy_message: "Translating text...",
    },
    ActionEntry {
        tag: ActionTag::Summarize,
        name: "summarize",
        build: build_summarize,
        destination: Destination::Substitute,
        scope: InputScope::SelectionOrDocument,
        busy_message: "Summarizing text...",
    },
    ActionEntry {
        tag: ActionTag::SuggestHeadlines,
        name: "headlines",
        build: build_headlines,
        destination: Destination::Conversation,
        scope: InputScope::SelectionOrDocument,
        busy_message: "Outlining headings...",
    },
    ActionEntry {
        tag: ActionTag::GenerateDocument,
        name: "generate",
        build: build_generate_document,
        destination: Destination::ReplaceDocument,
        scope: InputScope::Provided,
        busy_message: "Generating document...",
    },
    ActionEntry {
        tag: ActionTag::AnswerQuestion,
        name: "ask",
        build: build_answer_question,
        destination: Destination::Conversation,
        scope: InputScope::Provided,
        busy_message: "Thinking...",
    },
    ActionEntry {
        tag: ActionTag::Chat,
        name: "chat",
        build: build_chat,
        destination: Destination::Conversation,
        scope: InputScope::Provided,
        busy_message: "Thinking...",
    },
];

impl ActionKind {
    pub fn tag(&self) -> ActionTag {
        match self {
            ActionKind::Improve => ActionTag::Improve,
            ActionKind::Rewrite { .. } => ActionTag::Rewrite,
            ActionKind::Continue => ActionTag::Continue,
            ActionKind::FixGrammar => ActionTag::FixGrammar,
            ActionKind::Shorten => ActionTag::Shorten,
            ActionKind::Expand => ActionTag::Expand,
            ActionKind::Translate { .. } => ActionTag::Translate,
            ActionKind::Summarize => ActionTag::Summarize,
            ActionKind::SuggestHeadlines => ActionTag::SuggestHeadlines,
            ActionKind::GenerateDocument { .. } => ActionTag::GenerateDocument,
            ActionKind::AnswerQuestion { .. } => ActionTag::AnswerQuestion,
            ActionKind::Chat => ActionTag::Chat,
        }
    }

    pub fn entry(&self) -> &'static ActionEntry {
        entry_for(self.tag())
    }

    pub fn destination(&self) -> Destination {
        self.entry().destination
    }

    pub fn scope(&self) -> InputScope {
        self.entry().scope
    }

    pub fn name(&self) -> &'static str {
        self.entry().name
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn entry_for(tag: ActionTag) -> &'static ActionEntry {
    // Table order matches ActionTag declaration order.
    &ACTION_TABLE[tag as usize]
}

/// Wraps `text` into the instruction sent to the generation service. Total: never fails.
pub fn build_instruction(kind: &ActionKind, text: &str) -> String {
    (kind.entry().build)(kind, text)
}

fn build_improve(_: &ActionKind, text: &str) -> String {
    format!(
        "Improve the following text, making it more readable, correct, and professional. \
Keep the original meaning and language of the text:\n\n{text}\n\n{NO_COMMENTARY}"
    )
}

fn build_rewrite(kind: &ActionKind, text: &str) -> String {
    let style = match kind {
        ActionKind::Rewrite { style } => *style,
        _ => RewriteStyle::Neutral,
    };
    format!(
        "Rewrite the following text in {} style. \
Keep the main idea but change the wording:\n\n{text}\n\n{NO_COMMENTARY}",
        style.directive()
    )
}

fn build_continue(_: &ActionKind, text: &str) -> String {
    format!(
        "Continue the following text in a logical and coherent way. \
Write the next paragraph or a few sentences:\n\n{text}\n\n{NO_COMMENTARY}"
    )
}

fn build_fix_grammar(_: &ActionKind, text: &str) -> String {
    format!(
        "Fix all grammar, spelling, and punctuation mistakes in the following text:\n\n{text}\n\n{NO_COMMENTARY}"
    )
}

fn build_shorten(_: &ActionKind, text: &str) -> String {
    format!(
        "Shorten the following text, keeping the key points and the main meaning:\n\n{text}\n\n{NO_COMMENTARY}"
    )
}

fn build_expand(_: &ActionKind, text: &str) -> String {
    format!(
        "Expand the following text, adding more details, examples, and explanations:\n\n{text}\n\n{NO_COMMENTARY}"
    )
}

fn build_translate(kind: &ActionKind, text: &str) -> String {
    let language = match kind {
        ActionKind::Translate { target_language } if !target_language.trim().is_empty() => {
            target_language.trim()
        }
        _ => "English",
    };
    format!(
        "Translate the following text into {language}:\n\n{text}\n\nReturn only the translation, with no commentary, preamble, or explanations."
    )
}

fn build_summarize(_: &ActionKind, text: &str) -> String {
    format!(
        "Write a short summary of the following text, highlighting the main ideas:\n\n{text}\n\nReturn only the summary, with no commentary, preamble, or explanations."
    )
}

fn build_headlines(_: &ActionKind, text: &str) -> String {
    format!(
        "Analyze the following text and propose a structure of section headings:\n\n{text}\n\nReturn only the list of headings with a one-line description of each section."
    )
}

fn build_generate_document(kind: &ActionKind, text: &str) -> String {
    let doc_type = match kind {
        ActionKind::GenerateDocument { doc_type } => *doc_type,
        _ => DocumentType::Generic,
    };
    format!(
        "Create a {} based on the following description:\n\n{text}\n\n\
Produce a complete, well-structured, professional document. Return only the document, with no commentary.",
        doc_type.label()
    )
}

fn build_answer_question(kind: &ActionKind, text: &str) -> String {
    let context = match kind {
        ActionKind::AnswerQuestion { context } => context.as_str(),
        _ => "",
    };
    format!(
        "Answer the question using the following context.\n\nCONTEXT:\n{context}\n\nQUESTION:\n{text}\n\n\
Give a thorough and accurate answer based on the provided context, with no preamble."
    )
}

fn build_chat(_: &ActionKind, text: &str) -> String {
    format!(
        "You are an assistant inside a text editor. Help the user with their request:\n\n{text}\n\n\
Give a useful, specific answer with no preamble."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_kind() -> Vec<ActionKind> {
        vec![
            ActionKind::Improve,
            ActionKind::Rewrite {
                style: RewriteStyle::Formal,
            },
            ActionKind::Continue,
            ActionKind::FixGrammar,
            ActionKind::Shorten,
            ActionKind::Expand,
            ActionKind::Translate {
                target_language: "French".to_string(),
            },
            ActionKind::Summarize,
            ActionKind::SuggestHeadlines,
            ActionKind::GenerateDocument {
                doc_type: DocumentType::Letter,
            },
            ActionKind::AnswerQuestion {
                context: "ctx".to_string(),
            },
            ActionKind::Chat,
        ]
    }

    #[test]
    fn test_table_order_matches_tags() {
        for kind in every_kind() {
            assert_eq!(kind.entry().tag, kind.tag(), "table slot for {kind:?}");
        }
    }

    #[test]
    fn test_every_instruction_contains_input() {
        for kind in every_kind() {
            let instruction = build_instruction(&kind, "needle-text");
            assert!(instruction.contains("needle-text"), "{kind:?}");
        }
    }

    #[test]
    fn test_translate_names_language_and_input() {
        let kind = ActionKind::Translate {
            target_language: "French".to_string(),
        };
        let instruction = build_instruction(&kind, "Hello");
        assert!(instruction.contains("Hello"));
        assert!(instruction.contains("French"));
        assert!(instruction.contains("only the translation"));
    }

    #[test]
    fn test_rewrite_formal_directive() {
        let kind = ActionKind::Rewrite {
            style: RewriteStyle::parse("formal"),
        };
        let instruction = build_instruction(&kind, "hey whats up");
        assert!(instruction.contains("formal"));
        assert!(instruction.contains("hey whats up"));
        assert!(instruction.contains("no commentary"));
    }

    #[test]
    fn test_unknown_labels_fall_back() {
        assert_eq!(RewriteStyle::parse("pirate"), RewriteStyle::Neutral);
        assert_eq!(RewriteStyle::parse(" Academic "), RewriteStyle::Academic);
        assert_eq!(DocumentType::parse("poem"), DocumentType::Generic);

        let kind = ActionKind::GenerateDocument {
            doc_type: DocumentType::parse("poem"),
        };
        assert!(build_instruction(&kind, "a thing").contains("Create a document"));
        let kind = ActionKind::Rewrite {
            style: RewriteStyle::parse("pirate"),
        };
        assert!(build_instruction(&kind, "x").contains("neutral style"));
    }

    #[test]
    fn test_answer_question_embeds_context() {
        let kind = ActionKind::AnswerQuestion {
            context: "The sky is green here.".to_string(),
        };
        let instruction = build_instruction(&kind, "What color is the sky?");
        assert!(instruction.contains("CONTEXT:\nThe sky is green here."));
        assert!(instruction.contains("QUESTION:\nWhat color is the sky?"));
    }

    #[test]
    fn test_scopes_and_destinations() {
        assert_eq!(ActionKind::Improve.scope(), InputScope::SelectionOnly);
        assert_eq!(ActionKind::Continue.scope(), InputScope::SelectionOrDocument);
        assert_eq!(ActionKind::Chat.scope(), InputScope::Provided);
        assert_eq!(ActionKind::Chat.destination(), Destination::Conversation);
        assert_eq!(
            ActionKind::GenerateDocument {
                doc_type: DocumentType::Report
            }
            .destination(),
            Destination::ReplaceDocument
        );
        assert_eq!(ActionKind::Summarize.destination(), Destination::Substitute);
    }
}
