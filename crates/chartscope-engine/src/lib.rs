//! chartscope engine - turns chart directories into rendered manifests
//!
//! Rendering is delegated to an external tool behind the [`Renderer`] trait.
//! [`HelmRenderer`] drives `helm template`.

pub mod error;
pub mod helm;
pub mod renderer;

pub use error::{EngineError, Result};
pub use helm::{DEFAULT_RELEASE_NAME, HelmRenderer};
pub use renderer::{RenderedManifests, Renderer, count_documents};
