//! Model-agnostic prompt formatting.
//!
//! A local causal model sees one flat string, so the system/user pair has to
//! be rendered with the delimiters its family was tuned on.

use restyle_core::ChatPrompt;

/// Supported prompt formats, selectable via `LocalConfig.prompt_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFormat {
    /// Qwen2.5 / Hermes — `<|im_start|>role\n...\n<|im_end|>`
    ChatML,
    /// Llama 3.x — `<|start_header_id|>role<|end_header_id|>`
    Llama3,
    /// Base models without a chat template: system text, blank line, user text.
    Plain,
}

impl PromptFormat {
    /// Resolve a config value. `auto` (and anything unrecognised) inspects the model filename.
    pub fn from_config(value: &str, model_path: &str) -> Self {
        match value.to_lowercase().as_str() {
            "chatml" => Self::ChatML,
            "llama3" | "llama" => Self::Llama3,
            "plain" | "raw" => Self::Plain,
            _ => detect_format_from_filename(model_path),
        }
    }
}

/// Trait for model-family-specific prompt formatting.
pub trait PromptFormatter: Send + Sync {
    /// Format a single-turn system+user prompt ending with the assistant preamble.
    fn format_system_user(&self, system: &str, user: &str) -> String;

    fn format(&self, prompt: &ChatPrompt) -> String {
        self.format_system_user(&prompt.system, &prompt.user)
    }
}

/// Detect the prompt format from a GGUF filename.
///
/// Examples:
///  - `"llama-3.2-Korean-Bllossom-3B-Q4_K_M.gguf"` → `Llama3`
///  - `"Qwen2.5-3B-Instruct-Q4_K_M.gguf"` → `ChatML`
///  - `"polyglot-ko-5.8b.Q4_K_M.gguf"` → `Plain`
pub fn detect_format_from_filename(filename: &str) -> PromptFormat {
    let lower = filename.to_lowercase();
    if lower.contains("llama") || lower.contains("bllossom") {
        PromptFormat::Llama3
    } else if lower.contains("polyglot") {
        // Polyglot-ko is a base model with no chat template.
        PromptFormat::Plain
    } else {
        PromptFormat::ChatML
    }
}

/// Create a boxed formatter from a `PromptFormat` enum.
pub fn create_formatter(format: PromptFormat) -> Box<dyn PromptFormatter> {
    match format {
        PromptFormat::ChatML => Box::new(ChatMLFormatter),
        PromptFormat::Llama3 => Box::new(Llama3Formatter),
        PromptFormat::Plain => Box::new(PlainFormatter),
    }
}

pub struct ChatMLFormatter;

impl PromptFormatter for ChatMLFormatter {
    fn format_system_user(&self, system: &str, user: &str) -> String {
        format!(
            "<|im_start|>system\n{system}\n<|im_end|>\n\
             <|im_start|>user\n{user}\n<|im_end|>\n\
             <|im_start|>assistant\n"
        )
    }
}

pub struct Llama3Formatter;

impl PromptFormatter for Llama3Formatter {
    fn format_system_user(&self, system: &str, user: &str) -> String {
        format!(
            "<|begin_of_text|>\
             <|start_header_id|>system<|end_header_id|>\n\n\
             {system}<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\n\
             {user}<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\n"
        )
    }
}

pub struct PlainFormatter;

impl PromptFormatter for PlainFormatter {
    fn format_system_user(&self, system: &str, user: &str) -> String {
        format!("{system}\n\n{user}")
    }
}
