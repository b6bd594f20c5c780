//! Renderer invoker with content-addressed caching.
//!
//! [`Renderer::render`] resolves a request in three tiers:
//!
//! 1. the in-run map, keyed by [`CacheKey`] digest; concurrent requests for
//!    the same key block on one [`OnceLock`] so the renderer runs once
//! 2. the artifact store (a persistent cache directory, when configured)
//! 3. the external renderer, run in a scratch directory that is removed on
//!    every exit path
//!
//! [`Renderer::render_all`] renders a batch on the rayon thread pool and
//! returns results in request order.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use mdpdf_cache::{ArtifactStore, FileStore, OutputStore};
use mdpdf_config::{DiagramsConfig, RendererCommand};
use rayon::prelude::*;
use tempfile::TempDir;

use crate::cache::CacheKey;
use crate::cancel::CancelToken;
use crate::consts::SCRATCH_STEM;
use crate::error::{RenderError, RenderErrorKind};
use crate::language::{CachedArtifact, DiagramKind, DiagramRequest, ImageFormat};
use crate::plantuml;
use crate::process::{self, Invocation};

type Slot = Arc<OnceLock<Result<CachedArtifact, RenderError>>>;

/// Per-run rendering options.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Artifact format requested from every renderer.
    pub format: ImageFormat,
    /// Deadline for a single renderer invocation.
    pub timeout: Duration,
    /// Parent of the per-render scratch directories (system temp dir when `None`).
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            format: ImageFormat::default(),
            timeout: Duration::from_secs(60),
            scratch_dir: None,
        }
    }
}

/// Counters for the end-of-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// External renderer processes started.
    pub invocations: usize,
    /// Requests answered from the in-run map or the artifact store.
    pub cache_hits: usize,
}

/// Renders diagrams through external programs.
pub struct Renderer {
    mermaid: RendererCommand,
    plantuml: RendererCommand,
    settings: RenderSettings,
    store: Box<dyn ArtifactStore>,
    cancel: CancelToken,
    in_run: Mutex<HashMap<String, Slot>>,
    invocations: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl Renderer {
    #[must_use]
    pub fn new(
        mermaid: RendererCommand,
        plantuml: RendererCommand,
        store: Box<dyn ArtifactStore>,
    ) -> Self {
        Self {
            mermaid,
            plantuml,
            settings: RenderSettings::default(),
            store,
            cancel: CancelToken::new(),
            in_run: Mutex::new(HashMap::new()),
            invocations: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        }
    }

    /// Build a renderer from resolved configuration.
    ///
    /// A configured cache directory becomes a persistent [`FileStore`];
    /// otherwise artifacts go to the output directory and are never reused.
    #[must_use]
    pub fn from_config(config: &DiagramsConfig, format: ImageFormat) -> Self {
        let store: Box<dyn ArtifactStore> = match &config.cache_dir {
            Some(dir) => Box::new(FileStore::new(dir.clone())),
            None => Box::new(OutputStore::new(config.output_dir.clone())),
        };
        Self::new(config.mermaid.clone(), config.plantuml.clone(), store).with_settings(
            RenderSettings {
                format,
                timeout: config.render_timeout,
                scratch_dir: None,
            },
        )
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn stats(&self) -> RenderStats {
        RenderStats {
            invocations: self.invocations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Render one diagram, reusing any artifact already produced for its key.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the renderer cannot be started, exits
    /// non-zero, times out, produces no output, or the run is cancelled.
    pub fn render(&self, request: &DiagramRequest) -> Result<CachedArtifact, RenderError> {
        let kind = request.kind;
        let command = self.command(kind);
        let source = match kind {
            DiagramKind::PlantUml => plantuml::prepare_source(&request.source),
            DiagramKind::Mermaid => request.source.clone(),
        };
        let version = renderer_version(command);
        let key = CacheKey {
            kind: kind.name(),
            format: self.settings.format.extension(),
            renderer_version: &version,
            source: &source,
        }
        .compute_hash();

        let slot = {
            let mut map = self.in_run.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(key.clone()).or_default())
        };

        let mut initialized_here = false;
        let result = slot
            .get_or_init(|| {
                initialized_here = true;
                self.render_uncached(kind, command, &source, &key)
            })
            .clone();

        if !initialized_here && result.is_ok() {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%kind, key = short(&key), "in-run cache hit");
        }
        result
    }

    /// Render a batch in parallel. Results are in request order.
    #[must_use]
    pub fn render_all(
        &self,
        requests: &[DiagramRequest],
    ) -> Vec<Result<CachedArtifact, RenderError>> {
        if requests.is_empty() {
            return Vec::new();
        }
        requests.par_iter().map(|r| self.render(r)).collect()
    }

    fn command(&self, kind: DiagramKind) -> &RendererCommand {
        match kind {
            DiagramKind::Mermaid => &self.mermaid,
            DiagramKind::PlantUml => &self.plantuml,
        }
    }

    fn render_uncached(
        &self,
        kind: DiagramKind,
        command: &RendererCommand,
        source: &str,
        key: &str,
    ) -> Result<CachedArtifact, RenderError> {
        let fail = |reason| RenderError::new(kind, reason);
        let io = |e: std::io::Error| RenderError::new(kind, RenderErrorKind::Io(e.to_string()));

        if self.cancel.is_cancelled() {
            return Err(fail(RenderErrorKind::Cancelled));
        }

        let format = self.settings.format;
        let extension = format.extension();
        if let Some(image_path) = self.store.get(key, extension) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CachedArtifact {
                key: key.to_owned(),
                image_path,
                format,
            });
        }

        let scratch = self.scratch_dir().map_err(io)?;
        let input = scratch
            .path()
            .join(format!("{SCRATCH_STEM}.{}", kind.source_extension()));
        let output = scratch.path().join(format!("{SCRATCH_STEM}.{extension}"));
        fs::write(&input, source).map_err(io)?;

        let (program, args) = process::build_argv(
            command,
            &Invocation {
                input: &input,
                output: &output,
                output_dir: scratch.path(),
                format: extension,
            },
        )
        .ok_or_else(|| {
            fail(RenderErrorKind::Spawn {
                program: command.program.clone(),
                message: "empty program".to_owned(),
            })
        })?;

        self.invocations.fetch_add(1, Ordering::Relaxed);
        tracing::info!(%kind, key = short(key), program, "rendering diagram");

        let stderr = process::run(
            &program,
            &args,
            scratch.path(),
            self.settings.timeout,
            &self.cancel,
        )
        .map_err(fail)?;

        match fs::metadata(&output) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            _ => {
                return Err(fail(RenderErrorKind::MissingOutput {
                    expected: format!("{SCRATCH_STEM}.{extension}"),
                    stderr,
                }));
            }
        }

        let image_path = self.store.put(key, extension, &output).map_err(io)?;
        Ok(CachedArtifact {
            key: key.to_owned(),
            image_path,
            format,
        })
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("mdpdf-render-");
        match &self.settings.scratch_dir {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
    }
}

/// Identity of a renderer for cache keys.
fn renderer_version(command: &RendererCommand) -> String {
    format!(
        "mdpdf {} | {} {}",
        env!("CARGO_PKG_VERSION"),
        command.program,
        command.args.join(" ")
    )
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::time::Instant;
    use tempfile::TempDir;

    /// Shell-script stand-in for a real renderer.
    ///
    /// Every run appends a line to `calls`, then executes `body` with the
    /// input path as `$1` and the output path as `$2`.
    struct FakeRenderer {
        dir: TempDir,
    }

    impl FakeRenderer {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn command(&self, name: &str, body: &str) -> RendererCommand {
            let script = self.dir.path().join(format!("{name}.sh"));
            let calls = self.dir.path().join("calls");
            fs::write(
                &script,
                format!("echo {name} >> '{}'\n{body}\n", calls.display()),
            )
            .unwrap();
            RendererCommand {
                program: format!("sh {}", script.display()),
                args: vec!["{input}".to_owned(), "{output}".to_owned()],
            }
        }

        fn copying(&self, name: &str) -> RendererCommand {
            self.command(name, r#"cp "$1" "$2""#)
        }

        fn calls(&self) -> usize {
            fs::read_to_string(self.dir.path().join("calls"))
                .map(|s| s.lines().count())
                .unwrap_or(0)
        }

        fn scratch(&self) -> PathBuf {
            self.dir.path().join("scratch")
        }

        fn renderer(&self, mermaid: RendererCommand, plantuml: RendererCommand) -> Renderer {
            self.renderer_with_store(
                mermaid,
                plantuml,
                Box::new(FileStore::new(self.dir.path().join("cache"))),
            )
        }

        fn renderer_with_store(
            &self,
            mermaid: RendererCommand,
            plantuml: RendererCommand,
            store: Box<dyn ArtifactStore>,
        ) -> Renderer {
            Renderer::new(mermaid, plantuml, store).with_settings(RenderSettings {
                format: ImageFormat::Png,
                timeout: Duration::from_secs(10),
                scratch_dir: Some(self.scratch()),
            })
        }
    }

    fn is_empty_dir(path: &Path) -> bool {
        fs::read_dir(path).map_or(true, |mut entries| entries.next().is_none())
    }

    #[test]
    fn test_render_stores_artifact() {
        let fake = FakeRenderer::new();
        let renderer = fake.renderer(fake.copying("mermaid"), fake.copying("plantuml"));

        let artifact = renderer
            .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph TD; A-->B"))
            .unwrap();

        assert_eq!(artifact.format, ImageFormat::Png);
        assert_eq!(
            artifact.image_path,
            fake.dir.path().join("cache").join(format!("{}.png", artifact.key))
        );
        assert_eq!(
            fs::read_to_string(&artifact.image_path).unwrap(),
            "graph TD; A-->B"
        );
        assert_eq!(fake.calls(), 1);
        assert!(is_empty_dir(&fake.scratch()));
    }

    #[test]
    fn test_identical_requests_render_once() {
        let fake = FakeRenderer::new();
        let renderer = fake.renderer(fake.copying("mermaid"), fake.copying("plantuml"));
        let request = DiagramRequest::new(DiagramKind::Mermaid, "graph LR; X-->Y");

        let first = renderer.render(&request).unwrap();
        let second = renderer.render(&request).unwrap();

        assert_eq!(first, second);
        assert_eq!(fake.calls(), 1);
        assert_eq!(
            renderer.stats(),
            RenderStats {
                invocations: 1,
                cache_hits: 1
            }
        );
    }

    #[test]
    fn test_concurrent_identical_requests_render_once() {
        let fake = FakeRenderer::new();
        let renderer = fake.renderer(
            fake.command("mermaid", r#"sleep 0.2; cp "$1" "$2""#),
            fake.copying("plantuml"),
        );
        let requests = vec![DiagramRequest::new(DiagramKind::Mermaid, "graph TD; A-->B"); 8];

        let results = renderer.render_all(&requests);

        assert_eq!(fake.calls(), 1);
        let paths: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().image_path)
            .collect();
        assert!(paths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_persistent_cache_reused_across_renderers() {
        let fake = FakeRenderer::new();
        let request = DiagramRequest::new(DiagramKind::Mermaid, "graph TD; A-->B");

        let first = fake
            .renderer(fake.copying("mermaid"), fake.copying("plantuml"))
            .render(&request)
            .unwrap();
        let second_renderer = fake.renderer(fake.copying("mermaid"), fake.copying("plantuml"));
        let second = second_renderer.render(&request).unwrap();

        assert_eq!(first.image_path, second.image_path);
        assert_eq!(fake.calls(), 1);
        assert_eq!(second_renderer.stats().cache_hits, 1);
    }

    #[test]
    fn test_output_store_renders_each_run() {
        let fake = FakeRenderer::new();
        let request = DiagramRequest::new(DiagramKind::Mermaid, "graph TD; A-->B");
        let out = fake.dir.path().join("images");

        for _ in 0..2 {
            fake.renderer_with_store(
                fake.copying("mermaid"),
                fake.copying("plantuml"),
                Box::new(OutputStore::new(out.clone())),
            )
            .render(&request)
            .unwrap();
        }

        assert_eq!(fake.calls(), 2);
    }

    #[test]
    fn test_renderer_change_changes_key() {
        let fake = FakeRenderer::new();
        let request = DiagramRequest::new(DiagramKind::Mermaid, "graph TD; A-->B");

        let a = fake
            .renderer(fake.copying("mermaid"), fake.copying("plantuml"))
            .render(&request)
            .unwrap();
        let b = fake
            .renderer(fake.command("mermaid2", r#"cp "$1" "$2""#), fake.copying("plantuml"))
            .render(&request)
            .unwrap();

        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_plantuml_source_is_wrapped() {
        let fake = FakeRenderer::new();
        let renderer = fake.renderer(fake.copying("mermaid"), fake.copying("plantuml"));

        let artifact = renderer
            .render(&DiagramRequest::new(DiagramKind::PlantUml, "A -> B"))
            .unwrap();

        assert_eq!(
            fs::read_to_string(artifact.image_path).unwrap(),
            "@startuml\nA -> B\n@enduml"
        );
    }

    #[test]
    fn test_non_zero_exit_reports_stderr() {
        let fake = FakeRenderer::new();
        let renderer = fake.renderer(
            fake.command("mermaid", "echo 'Parse error on line 1' >&2; exit 1"),
            fake.copying("plantuml"),
        );

        let err = renderer
            .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph ??"))
            .unwrap_err();

        assert_eq!(err.kind, DiagramKind::Mermaid);
        assert!(matches!(err.reason, RenderErrorKind::NonZeroExit { ref stderr, .. } if stderr == "Parse error on line 1"));
        assert!(is_empty_dir(&fake.scratch()));
    }

    #[test]
    fn test_missing_output() {
        let fake = FakeRenderer::new();
        let renderer = fake.renderer(fake.command("mermaid", "exit 0"), fake.copying("plantuml"));

        let err = renderer
            .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph TD"))
            .unwrap_err();

        assert!(matches!(err.reason, RenderErrorKind::MissingOutput { .. }));
    }

    #[test]
    fn test_timeout_cleans_scratch() {
        let fake = FakeRenderer::new();
        let renderer = fake
            .renderer(fake.command("mermaid", "exec sleep 10"), fake.copying("plantuml"))
            .with_settings(RenderSettings {
                format: ImageFormat::Png,
                timeout: Duration::from_millis(200),
                scratch_dir: Some(fake.scratch()),
            });
        let started = Instant::now();

        let err = renderer
            .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph TD"))
            .unwrap_err();

        assert!(matches!(err.reason, RenderErrorKind::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(is_empty_dir(&fake.scratch()));
    }

    #[test]
    fn test_cancel_mid_render_leaves_nothing_behind() {
        let fake = FakeRenderer::new();
        // The helper outlives a plain kill of the shell and would write next
        // to the scratch directory.
        let renderer = fake.renderer(
            fake.command("mermaid", "(sleep 1; touch ../late) &\nwait"),
            fake.copying("plantuml"),
        );
        let cancel = CancelToken::new();
        let renderer = renderer.with_cancel_token(cancel.clone());
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            cancel.cancel();
        });

        let err = renderer
            .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph TD"))
            .unwrap_err();
        handle.join().unwrap();
        std::thread::sleep(Duration::from_millis(1500));

        assert!(err.is_cancelled());
        assert!(is_empty_dir(&fake.scratch()));
    }

    #[test]
    fn test_spawn_failure() {
        let fake = FakeRenderer::new();
        let missing = RendererCommand {
            program: "/nonexistent/mmdc".to_owned(),
            args: vec!["{input}".to_owned()],
        };
        let renderer = fake.renderer(missing, fake.copying("plantuml"));

        let err = renderer
            .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph TD"))
            .unwrap_err();

        assert!(matches!(err.reason, RenderErrorKind::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/mmdc"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let fake = FakeRenderer::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let renderer = fake
            .renderer(fake.copying("mermaid"), fake.copying("plantuml"))
            .with_cancel_token(cancel);

        let err = renderer
            .render(&DiagramRequest::new(DiagramKind::Mermaid, "graph TD"))
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn test_render_all_keeps_request_order() {
        let fake = FakeRenderer::new();
        let renderer = fake.renderer(
            fake.copying("mermaid"),
            fake.command("plantuml", "echo broken >&2; exit 1"),
        );
        let requests = vec![
            DiagramRequest::new(DiagramKind::Mermaid, "graph TD; A"),
            DiagramRequest::new(DiagramKind::PlantUml, "A -> B"),
            DiagramRequest::new(DiagramKind::Mermaid, "graph TD; B"),
        ];

        let results = renderer.render_all(&requests);

        assert_eq!(results.len(), 3);
        assert_eq!(
            fs::read_to_string(&results[0].as_ref().unwrap().image_path).unwrap(),
            "graph TD; A"
        );
        assert!(results[1].is_err());
        assert_eq!(
            fs::read_to_string(&results[2].as_ref().unwrap().image_path).unwrap(),
            "graph TD; B"
        );
    }
}
