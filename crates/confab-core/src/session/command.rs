//! Builtin chat commands.
//!
//! Input beginning with a recognized command prefix is intercepted before
//! the normal send path. Commands are resolved locally or routed to the
//! gateway's image path; they never reach the text-completion endpoint.

use std::fmt::Write as _;
use std::sync::OnceLock;

/// Prefix of the image-generation directive.
pub const IMAGINE_PREFIX: &str = "/imagine";

/// Prefix of the local help command.
pub const HELP_PREFIX: &str = "/help";

/// A builtin command available in every conversation.
#[derive(Debug, Clone)]
pub struct BuiltinCommand {
    /// Command name (without the leading /)
    pub name: &'static str,
    /// Usage format (e.g., "/imagine <prompt>")
    pub usage: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

static BUILTIN_COMMANDS: OnceLock<Vec<BuiltinCommand>> = OnceLock::new();

/// Returns all builtin commands. Initialized on first access and cached
/// for the lifetime of the process.
pub fn builtin_commands() -> &'static [BuiltinCommand] {
    BUILTIN_COMMANDS.get_or_init(|| {
        vec![
            BuiltinCommand {
                name: "imagine",
                usage: "/imagine <prompt>",
                description: "Generate an image from the given prompt",
            },
            BuiltinCommand {
                name: "help",
                usage: "/help",
                description: "Show available commands and their usage",
            },
        ]
    })
}

/// The result of classifying user input before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    /// Ordinary text routed to the completion endpoint.
    Plain,
    /// An image-generation directive with its prompt.
    Imagine { prompt: String },
    /// `/imagine` with no prompt; answered locally with usage text.
    ImagineMissingPrompt,
    /// `/help`; answered locally with the command list.
    Help,
}

/// Classifies trimmed input text.
///
/// Unrecognized `/...` prefixes fall through to the plain text path so a
/// message that merely starts with a slash is still sent normally.
pub fn parse_input(text: &str) -> ParsedInput {
    if text == HELP_PREFIX {
        return ParsedInput::Help;
    }
    if let Some(rest) = text.strip_prefix(IMAGINE_PREFIX) {
        // Require a word boundary: "/imagineers" is not a command.
        if rest.is_empty() {
            return ParsedInput::ImagineMissingPrompt;
        }
        if let Some(prompt) = rest.strip_prefix(' ') {
            let prompt = prompt.trim();
            if prompt.is_empty() {
                return ParsedInput::ImagineMissingPrompt;
            }
            return ParsedInput::Imagine {
                prompt: prompt.to_string(),
            };
        }
    }
    ParsedInput::Plain
}

/// Renders the locally generated reply for `/help`.
pub fn help_text() -> String {
    let mut out = String::from("Available commands:\n");
    for command in builtin_commands() {
        let _ = writeln!(out, "  {} - {}", command.usage, command.description);
    }
    out.trim_end().to_string()
}

/// Renders the locally generated reply for a malformed `/imagine`.
pub fn imagine_usage() -> String {
    "Usage: /imagine <prompt> - describe the image you want generated.".to_string()
}
