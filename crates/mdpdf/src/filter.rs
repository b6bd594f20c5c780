//! Filter command implementation.

use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use clap::Parser;
use mdpdf_ast::Pandoc;
use mdpdf_config::{CliSettings, Config, ParserKind};
use mdpdf_diagrams::CancelToken;
use mdpdf_filter::{Dispatcher, FilterError, FilterStats, OutputFormat};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::error::CliError;
use crate::output::Output;

/// Pandoc filter for diagrams, includes and code listings.
#[derive(Parser)]
#[command(name = "mdpdf", version, about)]
pub(crate) struct FilterArgs {
    /// Target format, passed by Pandoc.
    #[arg(default_value = "latex")]
    format: String,

    /// Path to configuration file (default: auto-discover mdpdf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root document; included paths resolve against its directory
    /// (default: current directory).
    #[arg(short, long, env = "MDPDF_DOCUMENT")]
    document: Option<PathBuf>,

    /// Abort on the first diagram or inclusion failure.
    #[arg(long)]
    fail_fast: bool,

    /// Persistent diagram cache directory (overrides config).
    #[arg(long, env = "MDPDF_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Render every diagram afresh, ignoring any cache directory.
    #[arg(long, conflicts_with = "cache_dir")]
    no_cache: bool,

    /// Renderer timeout in seconds (overrides config).
    #[arg(long)]
    timeout: Option<f64>,

    /// Parser for included documents: "pandoc" or "builtin".
    #[arg(long)]
    parser: Option<ParserKind>,

    /// Log progress and a summary to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl FilterArgs {
    /// Run the filter over stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the input is not a Pandoc
    /// document, or the run aborts.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let cancel = CancelToken::new();
        for signal in [SIGINT, SIGTERM] {
            // First signal cancels the run; a second one exits immediately.
            signal_hook::flag::register_conditional_shutdown(signal, 1, cancel.flag())?;
            signal_hook::flag::register(signal, cancel.flag())?;
        }

        let settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(path = %path.display(), "loaded configuration");
        }

        let (root_dir, root_document) = match &self.document {
            Some(document) => (document_dir(document), Some(document.as_path())),
            None => (std::env::current_dir()?, None),
        };
        let format = OutputFormat::parse(&self.format);
        let dispatcher =
            Dispatcher::from_config(&config, format, &root_dir, root_document, cancel.clone());

        let doc = Pandoc::read(io::stdin().lock())?;
        if cancel.is_cancelled() {
            return Err(FilterError::Cancelled.into());
        }
        let (doc, stats) = dispatcher.transform(doc)?;
        doc.write(BufWriter::new(io::stdout().lock()))?;

        self.report(output, &stats);
        Ok(())
    }

    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            fail_fast: self.fail_fast.then_some(true),
            cache_dir: self.cache_dir.clone(),
            cache_enabled: self.no_cache.then_some(false),
            timeout_seconds: self.timeout,
            parser: self.parser,
        }
    }

    fn report(&self, output: &Output, stats: &FilterStats) {
        if stats.errors > 0 {
            output.warning(&format!(
                "{} node(s) replaced by error markers",
                stats.errors
            ));
        }
        if self.verbose {
            output.info(&format!(
                "{} diagram(s): {} rendered, {} cached; {} document(s) and {} file(s) included",
                stats.diagrams,
                stats.renders,
                stats.cache_hits,
                stats.documents_included,
                stats.files_included
            ));
        }
    }
}

/// Directory of the root document, `.` for a bare file name.
fn document_dir(document: &Path) -> PathBuf {
    document
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
