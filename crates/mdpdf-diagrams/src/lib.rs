//! Diagram rendering via external renderers for mdpdf.
//!
//! Mermaid and `PlantUML` sources are rendered by spawning the configured
//! command-line renderers (`mmdc`, `plantuml`). Artifacts are named by a
//! SHA-256 digest of their inputs, so identical diagrams render once per run
//! and, with a cache directory, once across runs.
//!
//! # Architecture
//!
//! - [`language`]: `DiagramKind`, `ImageFormat`, request and artifact types
//! - [`cache`]: `CacheKey` digest computation
//! - [`renderer`]: `Renderer`, the caching invoker with parallel batches
//! - `process`: child process with deadline, cancellation and stderr capture
//! - `plantuml`: `@startuml` wrapping
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use mdpdf_cache::FileStore;
//! use mdpdf_config::RendererCommand;
//! use mdpdf_diagrams::{DiagramKind, DiagramRequest, Renderer};
//!
//! let renderer = Renderer::new(
//!     RendererCommand::mermaid(),
//!     RendererCommand::plantuml(),
//!     Box::new(FileStore::new(PathBuf::from(".mdpdf/cache"))),
//! );
//! let artifact = renderer
//!     .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph TD; A-->B"))
//!     .unwrap();
//! println!("{}", artifact.image_path.display());
//! ```

pub mod cache;
mod cancel;
mod consts;
mod error;
pub mod language;
mod plantuml;
mod process;
pub mod renderer;

pub use cache::CacheKey;
pub use cancel::CancelToken;
pub use error::{RenderError, RenderErrorKind};
pub use language::{CachedArtifact, DiagramKind, DiagramRequest, ImageFormat};
pub use renderer::{RenderSettings, RenderStats, Renderer};
