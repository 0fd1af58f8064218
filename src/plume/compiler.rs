//! Compile orchestration.
//!
//! A [`Compiler`] owns a configuration snapshot and an optional
//! incremental session, and drives the pipeline: scan → parse (gating per
//! construct, reusing session memo entries when enabled) → audit → emit.
//! Any fatal diagnostic aborts the compile with no partial output.
//!
//! Free functions [`compile`] and [`configure`](crate::plume::config::configure)
//! operate on the process-wide default configuration for callers that do
//! not hold a `Compiler`.

use crate::plume::ast::range::SourceLocation;
use crate::plume::audit;
use crate::plume::config::{self, CompileConfig};
use crate::plume::diagnostics::Diagnostic;
use crate::plume::emit;
use crate::plume::incremental;
use crate::plume::lexing;
use crate::plume::parsing::{MemoTable, Mode, Parser};

/// A configured compiler instance.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompileConfig,
    session: Option<String>,
}

impl Compiler {
    pub fn new(config: CompileConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// A compiler using the process-wide active configuration.
    pub fn with_active_config() -> Self {
        Self::new(config::active_config())
    }

    /// Replace this instance's configuration.
    pub fn configure(&mut self, config: CompileConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Opt subsequent compiles into memo reuse under the session id.
    pub fn enable_incremental(&mut self, session_id: impl Into<String>) {
        self.session = Some(session_id.into());
    }

    pub fn disable_incremental(&mut self) {
        self.session = None;
    }

    /// Translate plume source, or fail with the first fatal diagnostic.
    pub fn compile(&self, source: &str, mode: Mode) -> Result<String, Diagnostic> {
        let loc = SourceLocation::new(source);
        let stream = lexing::scan(source)?;

        let memo = match &self.session {
            Some(id) => incremental::seed_memo(id, source, &stream.tokens, self.config.target, mode),
            None => MemoTable::new(),
        };

        let mut parser = Parser::with_memo(
            source,
            &loc,
            &stream,
            self.config.target,
            mode,
            memo,
        );
        let result = parser.run();
        let memo = std::mem::take(&mut parser.memo);
        drop(parser);

        let module = match result {
            Ok(module) => module,
            Err(diag) => return Err(diag),
        };

        let warnings = audit::run(&module, &stream, source, &loc, self.config.strict)?;
        let translated = emit::emit(&module, &self.config, mode, &loc, &warnings);

        if let Some(id) = &self.session {
            incremental::store(
                id,
                source,
                stream.tokens.clone(),
                memo,
                self.config.target,
                mode,
            );
        }

        Ok(translated)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileConfig::default())
    }
}

/// Compile with the process-wide active configuration.
pub fn compile(source: &str, mode: Mode) -> Result<String, Diagnostic> {
    Compiler::with_active_config().compile(source, mode)
}
