use std::num::NonZeroU32;
use std::sync::OnceLock;

use anyhow::Result;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::context::LlamaContext;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel};
use llama_cpp_2::sampling::LlamaSampler;
use llama_cpp_2::token::LlamaToken;
use restyle_core::config::LocalConfig;

use super::model::{CausalLm, Encoding, SamplingParams, TokenId};

/// Global llama.cpp backend — initialized once, never freed until process exit.
/// llama_backend_init() is a global operation; calling it twice or freeing it
/// while models are live causes crashes.
static LLAMA_BACKEND: OnceLock<LlamaBackend> = OnceLock::new();

fn get_or_init_backend() -> Result<&'static LlamaBackend> {
    if let Some(backend) = LLAMA_BACKEND.get() {
        return Ok(backend);
    }
    let backend = LlamaBackend::init()
        .map_err(|e| anyhow::anyhow!("Failed to init llama backend: {:?}", e))?;
    Ok(LLAMA_BACKEND.get_or_init(|| backend))
}

/// Tokens of repetition history the penalty sampler looks back over.
const PENALTY_LAST_N: i32 = 64;

/// llama.cpp model + cached context. The GGUF file carries both the weights
/// and the tokenizer vocabulary.
///
/// Field order matters: Rust drops fields in declaration order.
/// `ctx` must drop before `model`.
pub struct LlamaCppModel {
    // SAFETY: `ctx` borrows `model` via a transmuted `'static` lifetime.
    // This is sound because `ctx` is declared first, so it drops before `model`.
    ctx: LlamaContext<'static>,
    model: LlamaModel,
    n_ctx: u32,
    pad_token: LlamaToken,
}

// SAFETY: LlamaCppModel is only reached through the local backend's mutex,
// ensuring exclusive access. The underlying llama_context raw pointer is safe
// to move between threads when not accessed concurrently.
unsafe impl Send for LlamaCppModel {}

impl LlamaCppModel {
    /// Load a GGUF model file. `n_gpu_layers` controls GPU offload (99 = all layers).
    pub fn load(cfg: &LocalConfig) -> Result<Self> {
        let backend = get_or_init_backend()?;

        tracing::info!("Loading weights and vocabulary from {}", cfg.model_path);
        let model_params =
            LlamaModelParams::default().with_n_gpu_layers(cfg.n_gpu_layers.max(0) as u32);
        let model = LlamaModel::load_from_file(backend, &cfg.model_path, &model_params)
            .map_err(|e| anyhow::anyhow!("Failed to load model: {:?}", e))?;

        // Create context once during load — avoids MB-scale KV cache re-allocation per generate().
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(cfg.n_ctx))
            .with_n_batch(cfg.n_ctx);
        let ctx = model
            .new_context(backend, ctx_params)
            .map_err(|e| anyhow::anyhow!("Failed to create context: {:?}", e))?;

        // SAFETY: `ctx` borrows `model`, but both live in this struct.
        // `ctx` is declared before `model`, so Rust drops it first — the borrow is always valid.
        let ctx: LlamaContext<'static> = unsafe { std::mem::transmute(ctx) };

        // GGUF models rarely define a pad token; EOS stands in for it.
        let pad_token = model.token_eos();

        Ok(Self {
            ctx,
            model,
            n_ctx: cfg.n_ctx,
            pad_token,
        })
    }
}

impl CausalLm for LlamaCppModel {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>> {
        let tokens = self
            .model
            .str_to_token(text, AddBos::Never)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {:?}", e))?;
        Ok(tokens.into_iter().map(|t| t.0).collect())
    }

    fn generate(&mut self, input: &Encoding, params: &SamplingParams) -> Result<Vec<TokenId>> {
        let attended: Vec<LlamaToken> = input
            .ids
            .iter()
            .zip(&input.attention_mask)
            .filter(|(_, &mask)| mask == 1)
            .map(|(&id, _)| LlamaToken(id))
            .collect();
        if attended.is_empty() {
            anyhow::bail!("Prompt has no attendable tokens");
        }
        if attended.len() + params.max_new_tokens as usize > self.n_ctx as usize {
            anyhow::bail!(
                "Prompt ({} tokens) plus {} new tokens exceeds context of {}",
                attended.len(),
                params.max_new_tokens,
                self.n_ctx
            );
        }

        // Clear KV cache from previous generation — cheap compared to re-creating the context.
        self.ctx.clear_kv_cache();

        let mut batch = LlamaBatch::new(self.n_ctx as usize, 1);
        let last_index = attended.len() as i32 - 1;
        for (i, token) in (0_i32..).zip(attended.iter().copied()) {
            batch
                .add(token, i, &[0], i == last_index)
                .map_err(|e| anyhow::anyhow!("Batch add failed: {:?}", e))?;
        }

        self.ctx
            .decode(&mut batch)
            .map_err(|e| anyhow::anyhow!("Initial decode failed: {:?}", e))?;

        let mut sampler = LlamaSampler::chain_simple([
            LlamaSampler::penalties(PENALTY_LAST_N, params.repetition_penalty, 0.0, 0.0),
            LlamaSampler::temp(params.temperature),
            LlamaSampler::top_p(params.top_p, 1),
            LlamaSampler::dist(params.seed),
        ]);

        let mut output = input.ids.clone();
        let mut n_cur = batch.n_tokens();

        for _ in 0..params.max_new_tokens {
            let token = sampler.sample(&self.ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if self.model.is_eog_token(token) || token == self.pad_token {
                break;
            }
            output.push(token.0);

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .map_err(|e| anyhow::anyhow!("Batch add failed: {:?}", e))?;
            n_cur += 1;

            self.ctx
                .decode(&mut batch)
                .map_err(|e| anyhow::anyhow!("Decode failed: {:?}", e))?;
        }

        Ok(output)
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        let mut decoder = encoding_rs::UTF_8.new_decoder();
        let mut text = String::new();
        for &id in tokens {
            let token = LlamaToken(id);
            if self.model.is_eog_token(token) {
                continue;
            }
            // special=false renders control tokens as nothing. Undecodable
            // pieces are skipped rather than failing the whole response.
            match self.model.token_to_piece(token, &mut decoder, false, None) {
                Ok(piece) => text.push_str(&piece),
                Err(e) => tracing::debug!("Skipping undecodable token {}: {:?}", id, e),
            }
        }
        Ok(text)
    }

    fn pad_token(&self) -> TokenId {
        self.pad_token.0
    }
}
