use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use restyle_core::config::LocalConfig;
use restyle_core::interfaces::LoadState;
use restyle_core::{ChatPrompt, GenerationBackend, GenerationError};
use tokio::sync::{watch, Mutex};

use super::format::{create_formatter, PromptFormat, PromptFormatter};
use super::model::{CausalLm, Encoding, SamplingParams};

type ModelSlot = Arc<Mutex<Option<Box<dyn CausalLm>>>>;

/// Async wrapper around a blocking `CausalLm` using `spawn_blocking`.
///
/// The model sits behind one async mutex, so inferences run one at a time and
/// later requests queue. The owned guard is taken inside the timeout window and
/// moved onto the blocking worker; an abandoned worker keeps the lock until it
/// finishes, then releases it.
pub struct LocalBackend {
    inner: ModelSlot,
    state: watch::Sender<LoadState>,
    formatter: Box<dyn PromptFormatter>,
    params: SamplingParams,
    max_prompt_tokens: usize,
    timeout: Duration,
    config: LocalConfig,
}

impl LocalBackend {
    pub fn new(config: LocalConfig) -> Self {
        let format = PromptFormat::from_config(&config.prompt_format, &config.model_path);
        tracing::debug!("Local prompt format: {format:?}");
        let (state, _) = watch::channel(LoadState::Uninitialized);
        Self {
            inner: Arc::new(Mutex::new(None)),
            state,
            formatter: create_formatter(format),
            params: SamplingParams::from(&config),
            max_prompt_tokens: config.max_prompt_tokens,
            timeout: config.timeout(),
            config,
        }
    }

    /// Load the configured GGUF model with llama.cpp.
    #[cfg(feature = "llama")]
    pub async fn load(&self) -> Result<()> {
        let cfg = self.config.clone();
        self.load_with(move || {
            let model = super::backend::LlamaCppModel::load(&cfg)?;
            Ok(Box::new(model) as Box<dyn CausalLm>)
        })
        .await
    }

    #[cfg(not(feature = "llama"))]
    pub async fn load(&self) -> Result<()> {
        let reason = format!(
            "cannot load {}: built without the `llama` feature",
            self.config.model_path
        );
        self.state.send_replace(LoadState::Failed(reason.clone()));
        anyhow::bail!(reason)
    }

    /// Drive `Uninitialized → Loading → Ready` with a custom loader.
    ///
    /// The loader runs on a blocking worker. On failure the backend ends in
    /// `Failed` and keeps answering `NotReady`.
    pub async fn load_with<F>(&self, loader: F) -> Result<()>
    where
        F: FnOnce() -> Result<Box<dyn CausalLm>> + Send + 'static,
    {
        let previous = self.state.send_replace(LoadState::Loading);
        if matches!(previous, LoadState::Loading | LoadState::Ready) {
            self.state.send_replace(previous.clone());
            anyhow::bail!("model is already {}", previous.as_str());
        }

        let path = self.config.model_path.clone();
        tracing::info!("Loading local model from {path}");
        let inner = self.inner.clone();
        // Phase logs on the worker go to the caller's subscriber.
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());
        let outcome = tokio::task::spawn_blocking(move || -> Result<()> {
            tracing::dispatcher::with_default(&dispatch, || -> Result<()> {
                tracing::info!("Tokenizer: vocabulary embedded in {path}");
                let mut guard = inner.blocking_lock();
                let stale = guard.take().is_some();
                tracing::info!(stale, "Released stale model memory");
                tracing::info!("Loading model weights");
                let model = loader()?;
                tracing::info!("Pinned pad token {}", model.pad_token());
                *guard = Some(model);
                Ok(())
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("Model loader panicked: {e}"))
        .and_then(|r| r);

        match outcome {
            Ok(()) => {
                self.state.send_replace(LoadState::Ready);
                tracing::info!("Local model ready");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Local model failed to load: {e:#}");
                self.state.send_replace(LoadState::Failed(format!("{e:#}")));
                Err(e)
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Override the configured inference budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Tokenize, generate, and decode only the continuation.
fn run_inference(
    model: &mut dyn CausalLm,
    prompt: &str,
    max_prompt_tokens: usize,
    params: &SamplingParams,
) -> Result<String> {
    let ids = model.tokenize(prompt)?;
    if ids.len() > max_prompt_tokens {
        tracing::debug!("Truncating prompt from {} to {max_prompt_tokens} tokens", ids.len());
    }
    let input = Encoding::truncated(ids, max_prompt_tokens);

    let output = model.generate(&input, params)?;
    let continuation = output.get(input.len()..).ok_or_else(|| {
        anyhow::anyhow!(
            "Model returned {} tokens, shorter than the {}-token prompt",
            output.len(),
            input.len()
        )
    })?;
    model.decode(continuation)
}

#[async_trait]
impl GenerationBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    async fn generate(&self, prompt: &ChatPrompt) -> Result<String, GenerationError> {
        if !self.state().is_ready() {
            return Err(GenerationError::NotReady);
        }

        let text = self.formatter.format(prompt);
        let inner = self.inner.clone();
        let params = self.params.clone();
        let max_prompt_tokens = self.max_prompt_tokens;

        let work = async move {
            let mut guard = inner.lock_owned().await;
            tokio::task::spawn_blocking(move || {
                let slot: &mut Option<Box<dyn CausalLm>> = &mut guard;
                let model = slot
                    .as_mut()
                    .ok_or_else(|| anyhow::anyhow!("Model not loaded"))?;
                run_inference(&mut **model, &text, max_prompt_tokens, &params)
            })
            .await
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(e))) => {
                tracing::error!("Local inference failed: {e:#}");
                Err(e.into())
            }
            Ok(Err(join_err)) => {
                tracing::error!("Inference worker died: {join_err}");
                Err(GenerationError::Backend(format!("inference worker failed: {join_err}")))
            }
            Err(_) => {
                tracing::warn!("Inference exceeded {:?}, abandoning", self.timeout);
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::model::TokenId;

    /// Byte-level toy model whose `generate` echoes the prompt and appends a reply.
    struct Parrot {
        reply: &'static str,
    }

    impl CausalLm for Parrot {
        fn tokenize(&self, text: &str) -> Result<Vec<TokenId>> {
            Ok(text.bytes().map(TokenId::from).collect())
        }

        fn generate(&mut self, input: &Encoding, _: &SamplingParams) -> Result<Vec<TokenId>> {
            let mut out = input.ids.clone();
            out.extend(self.reply.bytes().map(TokenId::from));
            Ok(out)
        }

        fn decode(&self, tokens: &[TokenId]) -> Result<String> {
            let bytes: Vec<u8> = tokens.iter().map(|&t| t as u8).collect();
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }

        fn pad_token(&self) -> TokenId {
            0
        }
    }

    #[test]
    fn inference_drops_echoed_prompt() {
        let mut model = Parrot { reply: "reply" };
        let params = SamplingParams::from(&LocalConfig::default());
        let out = run_inference(&mut model, "the prompt", 512, &params).unwrap();
        assert_eq!(out, "reply");
    }

    #[test]
    fn inference_respects_truncation() {
        let mut model = Parrot { reply: "!" };
        let params = SamplingParams::from(&LocalConfig::default());
        // Only the first 4 prompt bytes survive, and only they are sliced off.
        let out = run_inference(&mut model, "abcdefgh", 4, &params).unwrap();
        assert_eq!(out, "!");
    }

    #[tokio::test]
    async fn new_backend_is_uninitialized_and_not_ready() {
        let backend = LocalBackend::new(LocalConfig::default());
        assert_eq!(backend.state(), LoadState::Uninitialized);
        let prompt = ChatPrompt { system: "s".into(), user: "u".into() };
        assert_eq!(backend.generate(&prompt).await, Err(GenerationError::NotReady));
    }

    #[tokio::test]
    async fn second_load_is_rejected() {
        let backend = LocalBackend::new(LocalConfig::default());
        backend
            .load_with(|| Ok(Box::new(Parrot { reply: "a" }) as Box<dyn CausalLm>))
            .await
            .unwrap();
        let again = backend
            .load_with(|| Ok(Box::new(Parrot { reply: "b" }) as Box<dyn CausalLm>))
            .await;
        assert!(again.is_err());
        assert_eq!(backend.state(), LoadState::Ready);
    }

    #[tokio::test]
    async fn load_logs_every_phase_in_order() {
        let buf = Arc::new(std::sync::Mutex::new(Vec::<u8>::new()));
        let sink = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || LogSink(sink.clone()))
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let backend = LocalBackend::new(LocalConfig::default());
        backend
            .load_with(|| Ok(Box::new(Parrot { reply: "a" }) as Box<dyn CausalLm>))
            .await
            .unwrap();

        let logs = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        let mut from = 0;
        for phase in [
            "Tokenizer",
            "Released stale model memory",
            "Loading model weights",
            "Pinned pad token",
            "Local model ready",
        ] {
            let at = logs[from..]
                .find(phase)
                .unwrap_or_else(|| panic!("missing {phase:?} in:\n{logs}"));
            from += at + phase.len();
        }
    }

    struct LogSink(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
