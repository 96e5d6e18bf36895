//! The opaque model capability the local backend drives.

use anyhow::Result;
use restyle_core::config::LocalConfig;

pub type TokenId = i32;

/// Tokenized prompt plus its attention mask (1 = attend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub ids: Vec<TokenId>,
    pub attention_mask: Vec<u8>,
}

impl Encoding {
    /// Keep at most `max_len` tokens and mark every kept token attendable.
    pub fn truncated(mut ids: Vec<TokenId>, max_len: usize) -> Self {
        ids.truncate(max_len);
        let attention_mask = vec![1; ids.len()];
        Self { ids, attention_mask }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Fixed per deployment; never taken from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub max_new_tokens: u32,
    pub seed: u32,
}

impl From<&LocalConfig> for SamplingParams {
    fn from(cfg: &LocalConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            repetition_penalty: cfg.repetition_penalty,
            max_new_tokens: cfg.max_new_tokens,
            seed: cfg.seed,
        }
    }
}

/// Tokenize / generate / detokenize over a loaded causal language model.
///
/// Calls are blocking and may take minutes; callers run them on a worker
/// thread and never concurrently against one instance.
pub trait CausalLm: Send {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>>;

    /// Returns the prompt tokens followed by the newly sampled ones.
    fn generate(&mut self, input: &Encoding, params: &SamplingParams) -> Result<Vec<TokenId>>;

    /// Detokenize, skipping special tokens.
    fn decode(&self, tokens: &[TokenId]) -> Result<String>;

    fn pad_token(&self) -> TokenId;
}
