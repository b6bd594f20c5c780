//! Node dispatcher.
//!
//! [`Dispatcher::transform`] walks the document once, pre-order, and
//! rewrites the blocks that need it:
//!
//! | Block                         | Handler                                  |
//! |-------------------------------|------------------------------------------|
//! | ```` ```mdinclude ````        | resolved off-tree, spliced, then walked  |
//! | ```` ```codeblock-include ````| files read, then formatted as code       |
//! | ```` ```mermaid ````/`plantuml`| recorded, rendered in parallel after the walk |
//! | other code blocks             | `lstlisting` for LaTeX, unchanged otherwise |
//! | level-4 headers               | followed by `\vspace` for LaTeX          |
//!
//! Diagram positions are recorded as [`NodePath`]s. Every later edit of the
//! tree happens at or after the walk cursor, so recorded paths stay valid
//! until substitution.

use std::mem;
use std::path::Path;
use std::sync::Arc;

use mdpdf_ast::{Attr, Block, Pandoc, inline};
use mdpdf_config::{Config, ParserKind};
use mdpdf_diagrams::{
    CachedArtifact, CancelToken, DiagramKind, DiagramRequest, ImageFormat, Renderer,
};
use mdpdf_include::{
    CODEBLOCK_INCLUDE, CmarkParser, DocumentParser, IncludedCode, MDINCLUDE, PandocParser,
    Resolver,
};
use mdpdf_latex::{CodeFormatter, Placement};

use crate::error::FilterError;
use crate::format::OutputFormat;
use crate::path::NodePath;

/// Class of the `Div` standing in for a failed node in non-LaTeX output.
pub const ERROR_CLASS: &str = "mdpdf-error";

/// Behaviour switches for one run.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub format: OutputFormat,
    /// Abort on the first per-node failure instead of marking it.
    pub fail_fast: bool,
    /// LaTeX length inserted after level-4 headers; `None` disables.
    pub header_spacing: Option<String>,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Diagram blocks found.
    pub diagrams: usize,
    /// Renderer processes started.
    pub renders: usize,
    /// Diagrams served from the in-run map or the cache directory.
    pub cache_hits: usize,
    /// Markdown documents spliced in, nested ones included.
    pub documents_included: usize,
    /// Files read into code blocks.
    pub files_included: usize,
    /// Code blocks rewritten as listings.
    pub code_blocks: usize,
    /// Nodes replaced by error markers.
    pub errors: usize,
}

/// Rewrites a Pandoc document.
pub struct Dispatcher {
    options: FilterOptions,
    renderer: Renderer,
    resolver: Resolver,
    formatter: CodeFormatter,
    cancel: CancelToken,
}

#[derive(Debug)]
struct PendingDiagram {
    path: NodePath,
    kind: DiagramKind,
    caption: Option<String>,
}

#[derive(Default)]
struct Walk {
    pending: Vec<PendingDiagram>,
    requests: Vec<DiagramRequest>,
    stats: FilterStats,
}

/// What to do with the block under the cursor.
enum Action {
    Descend,
    IncludeDocuments(String),
    IncludeCode(Attr, String),
    Diagram(DiagramKind, String, Option<String>),
    FormatCode(Attr, String),
    SpaceAfterHeader(String),
    Keep,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        options: FilterOptions,
        renderer: Renderer,
        resolver: Resolver,
        formatter: CodeFormatter,
    ) -> Self {
        Self {
            options,
            renderer,
            resolver,
            formatter,
            cancel: CancelToken::new(),
        }
    }

    /// Abort the run once `cancel` is set, including in-flight renders.
    ///
    /// Parsers of included documents hold their own flag; see
    /// [`Dispatcher::from_config`].
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.renderer = self.renderer.with_cancel_token(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Build a dispatcher from loaded configuration.
    ///
    /// `root_dir` is the directory inclusion paths of the root document are
    /// relative to; `root_document`, when known, is guarded against being
    /// included into itself.
    #[must_use]
    pub fn from_config(
        config: &Config,
        format: OutputFormat,
        root_dir: &Path,
        root_document: Option<&Path>,
        cancel: CancelToken,
    ) -> Self {
        let image_format = config
            .diagrams_resolved
            .format
            .as_deref()
            .and_then(ImageFormat::parse)
            .unwrap_or_else(|| format.image_format());
        let renderer = Renderer::from_config(&config.diagrams_resolved, image_format);

        let parser: Arc<dyn DocumentParser> = match config.include.parser {
            ParserKind::Pandoc => Arc::new(
                PandocParser::new(config.include.pandoc.clone())
                    .with_timeout(config.diagrams_resolved.render_timeout)
                    .with_cancel_flag(cancel.flag()),
            ),
            ParserKind::Builtin => Arc::new(CmarkParser),
        };
        let mut resolver =
            Resolver::new(parser, root_dir).with_max_depth(config.filter.max_include_depth);
        if let Some(document) = root_document {
            resolver = resolver.with_root_document(document);
        }

        let header_spacing = Some(config.filter.header_spacing.clone()).filter(|s| !s.is_empty());

        Self::new(
            FilterOptions {
                format,
                fail_fast: config.filter.fail_fast,
                header_spacing,
            },
            renderer,
            resolver,
            CodeFormatter::new(config.style.clone()),
        )
        .with_cancel_token(cancel)
    }

    /// Rewrite `doc`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Cancelled`] when the run is interrupted at any
    /// point, and the first per-node error in fail-fast mode.
    pub fn transform(&self, mut doc: Pandoc) -> Result<(Pandoc, FilterStats), FilterError> {
        let mut walk = Walk::default();

        self.walk(&mut doc.blocks, &NodePath::default(), 0, &mut walk)?;
        self.render_diagrams(&mut doc.blocks, &mut walk)?;

        if self.cancel.is_cancelled() {
            return Err(FilterError::Cancelled);
        }

        if self.options.format.is_latex() {
            doc.push_header_include(&mdpdf_latex::preamble(self.formatter.style()));
        }

        let render = self.renderer.stats();
        let mut stats = walk.stats;
        stats.renders = render.invocations;
        stats.cache_hits = render.cache_hits;

        tracing::info!(
            diagrams = stats.diagrams,
            renders = stats.renders,
            cache_hits = stats.cache_hits,
            includes = stats.documents_included + stats.files_included,
            code_blocks = stats.code_blocks,
            errors = stats.errors,
            "document transformed"
        );
        Ok((doc, stats))
    }

    fn walk(
        &self,
        blocks: &mut Vec<Block>,
        parent: &NodePath,
        list: usize,
        walk: &mut Walk,
    ) -> Result<(), FilterError> {
        let mut i = 0;
        while i < blocks.len() {
            if self.cancel.is_cancelled() {
                return Err(FilterError::Cancelled);
            }
            let path = parent.child(list, i);

            match self.classify(&blocks[i]) {
                Action::IncludeDocuments(directives) => {
                    match self
                        .resolver
                        .resolve_document_inclusion(&directives, self.resolver.root_dir())
                    {
                        Ok(inclusion) => {
                            walk.stats.documents_included += inclusion.documents;
                            // The cursor stays put so spliced blocks are walked next.
                            blocks.splice(i..=i, inclusion.blocks);
                        }
                        Err(e) => {
                            blocks[i] = self.fail(e.into(), walk)?;
                            i += 1;
                        }
                    }
                    continue;
                }
                Action::IncludeCode(attr, directives) => {
                    blocks[i] = match self
                        .resolver
                        .resolve_code_inclusion(&directives, self.resolver.root_dir())
                    {
                        Ok(code) => {
                            walk.stats.files_included += code.files.len();
                            self.included_code_block(&attr, code, walk)
                        }
                        Err(e) => self.fail(e.into(), walk)?,
                    };
                }
                Action::Diagram(kind, source, caption) => {
                    walk.requests.push(DiagramRequest::new(kind, source));
                    walk.pending.push(PendingDiagram {
                        path,
                        kind,
                        caption,
                    });
                }
                Action::FormatCode(attr, text) => {
                    blocks[i] = self.formatter.format_block(&attr, &text);
                    walk.stats.code_blocks += 1;
                }
                Action::SpaceAfterHeader(length) => {
                    blocks.insert(i + 1, Block::raw_latex(mdpdf_latex::vspace(&length)));
                    i += 2;
                    continue;
                }
                Action::Descend => {
                    for (j, children) in blocks[i].children_mut().into_iter().enumerate() {
                        self.walk(children, &path, j, walk)?;
                    }
                }
                Action::Keep => {}
            }
            i += 1;
        }
        Ok(())
    }

    fn classify(&self, block: &Block) -> Action {
        let latex = self.options.format.is_latex();
        match block {
            Block::CodeBlock(attr, text) => match attr.first_class() {
                Some(MDINCLUDE) => Action::IncludeDocuments(text.clone()),
                Some(CODEBLOCK_INCLUDE) => Action::IncludeCode(attr.clone(), text.clone()),
                class => match class.and_then(DiagramKind::parse) {
                    Some(kind) => Action::Diagram(
                        kind,
                        text.clone(),
                        attr.attribute("caption").map(str::to_owned),
                    ),
                    None if latex => Action::FormatCode(attr.clone(), text.clone()),
                    None => Action::Keep,
                },
            },
            Block::Header(4, _, _) if latex => self
                .options
                .header_spacing
                .clone()
                .map_or(Action::Keep, Action::SpaceAfterHeader),
            block if !block_has_children(block) => Action::Keep,
            _ => Action::Descend,
        }
    }

    fn included_code_block(&self, attr: &Attr, code: IncludedCode, walk: &mut Walk) -> Block {
        let language = attr
            .classes()
            .iter()
            .find(|c| c.as_str() != CODEBLOCK_INCLUDE)
            .cloned()
            .or(code.language);

        if self.options.format.is_latex() {
            walk.stats.code_blocks += 1;
            Block::raw_latex(self.formatter.format(
                language.as_deref(),
                attr.attribute("caption"),
                &code.text,
            ))
        } else {
            Block::CodeBlock(
                Attr(attr.id().to_owned(), language.into_iter().collect(), attr.2.clone()),
                code.text,
            )
        }
    }

    fn render_diagrams(&self, blocks: &mut Vec<Block>, walk: &mut Walk) -> Result<(), FilterError> {
        if walk.requests.is_empty() {
            return Ok(());
        }
        walk.stats.diagrams = walk.requests.len();

        let results = self.renderer.render_all(&walk.requests);
        if results
            .iter()
            .any(|r| r.as_ref().is_err_and(mdpdf_diagrams::RenderError::is_cancelled))
        {
            return Err(FilterError::Cancelled);
        }

        for (diagram, result) in mem::take(&mut walk.pending).into_iter().zip(results) {
            let replacement = match result {
                Ok(artifact) => self.diagram_block(diagram.kind, &artifact, diagram.caption.as_deref()),
                Err(e) => self.fail(e.into(), walk)?,
            };
            match diagram.path.get_mut(blocks) {
                Some(slot) => *slot = replacement,
                None => tracing::warn!(path = ?diagram.path, "diagram position vanished"),
            }
        }
        Ok(())
    }

    fn diagram_block(
        &self,
        kind: DiagramKind,
        artifact: &CachedArtifact,
        caption: Option<&str>,
    ) -> Block {
        let caption = caption.map_or_else(|| format!("{} diagram", kind.label()), str::to_owned);
        let url = artifact.image_path.to_string_lossy();

        if self.options.format.is_latex() {
            let placement = match kind {
                DiagramKind::Mermaid => Placement::Here,
                DiagramKind::PlantUml => Placement::Float,
            };
            Block::raw_latex(mdpdf_latex::figure(&url, &caption, placement))
        } else {
            Block::Para(vec![inline::image(&url, &caption)])
        }
    }

    /// Apply the failure policy to a per-node error.
    fn fail(&self, error: FilterError, walk: &mut Walk) -> Result<Block, FilterError> {
        let error = if self.cancel.is_cancelled() {
            FilterError::Cancelled
        } else {
            error.normalize()
        };
        if self.options.fail_fast || matches!(error, FilterError::Cancelled) {
            return Err(error);
        }

        walk.stats.errors += 1;
        tracing::warn!(%error, "replacing node with error marker");
        Ok(self.error_block(&error.to_string()))
    }

    fn error_block(&self, message: &str) -> Block {
        if self.options.format.is_latex() {
            return Block::raw_latex(mdpdf_latex::error_box(message));
        }
        let mut content = vec![inline::strong(vec![inline::str("Error:")]), inline::space()];
        content.extend(inline::text(message));
        Block::Div(Attr::with_classes([ERROR_CLASS]), vec![Block::Para(content)])
    }
}

fn block_has_children(block: &Block) -> bool {
    matches!(
        block,
        Block::BlockQuote(_)
            | Block::OrderedList(..)
            | Block::BulletList(_)
            | Block::DefinitionList(_)
            | Block::Figure(..)
            | Block::Table(..)
            | Block::Div(..)
    )
}
