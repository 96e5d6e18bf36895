//! Shared application state

use restyle_ai::Transformer;

/// Cloned into every handler. Holds no mutable state of its own; the backend
/// behind the transformer owns the only shared resource.
#[derive(Clone)]
pub struct AppState {
    pub transformer: Transformer,
}

impl AppState {
    pub fn new(transformer: Transformer) -> Self {
        Self { transformer }
    }
}
