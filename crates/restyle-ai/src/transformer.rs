//! Request handler: style resolution, prompt assembly, one backend call,
//! post-processing. Failures come back as values, never as panics.

use std::sync::Arc;

use restyle_core::{
    ChatPrompt, GenerationBackend, GenerationError, GenerationResult, Style, StylePolicy,
};

use crate::{decorate, prompt};

/// Which deployment variant a transformer serves. Decides how unknown styles
/// are treated, which templates are used, and how raw output is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Remote,
}

impl Deployment {
    pub fn style_policy(self) -> StylePolicy {
        match self {
            Deployment::Local => StylePolicy::Fallback(Style::Casual),
            Deployment::Remote => StylePolicy::Strict,
        }
    }

    pub fn build_prompt(self, style: Style, text: &str) -> ChatPrompt {
        match self {
            Deployment::Local => prompt::local_prompt(style, text),
            Deployment::Remote => prompt::remote_prompt(style, text),
        }
    }

    /// Local output is trimmed (and decorated for decorative styles); remote
    /// output is passed through verbatim. A local continuation with no text
    /// left after trimming is a failed generation.
    pub fn finish(self, style: Style, raw: String) -> Result<String, GenerationError> {
        match self {
            Deployment::Local if raw.trim().is_empty() => {
                Err(GenerationError::Backend("model produced no text".into()))
            }
            Deployment::Local => Ok(decorate::finish(style, &raw)),
            Deployment::Remote => Ok(raw),
        }
    }
}

#[derive(Clone)]
pub struct Transformer {
    backend: Arc<dyn GenerationBackend>,
    deployment: Deployment,
}

impl Transformer {
    pub fn new(deployment: Deployment, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            deployment,
        }
    }

    pub fn local(backend: Arc<dyn GenerationBackend>) -> Self {
        Self::new(Deployment::Local, backend)
    }

    pub fn remote(backend: Arc<dyn GenerationBackend>) -> Self {
        Self::new(Deployment::Remote, backend)
    }

    pub fn deployment(&self) -> Deployment {
        self.deployment
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Transform `text` into `style`. Attempted exactly once.
    pub async fn transform(&self, text: &str, style: &str) -> GenerationResult {
        let result = self.try_transform(text, style).await;
        if let Err(e) = &result {
            tracing::warn!("Transform ({} backend) failed: {e}", self.backend.name());
        }
        result.into()
    }

    async fn try_transform(&self, text: &str, label: &str) -> Result<String, GenerationError> {
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyInput);
        }
        let style = self.deployment.style_policy().resolve(label)?;
        let prompt = self.deployment.build_prompt(style, text);
        tracing::debug!("Transforming {} chars into {style}", text.chars().count());

        // A panicking backend must not take the connection down with it.
        let backend = self.backend.clone();
        let raw = tokio::spawn(async move { backend.generate(&prompt).await })
            .await
            .map_err(|e| GenerationError::Backend(format!("backend task failed: {e}")))??;

        self.deployment.finish(style, raw)
    }
}
