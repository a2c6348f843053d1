/// The resolution pipeline: Category → line → rendered text → final text.
///
/// Wires together conditional selection, template rendering and
/// placeholder substitution.

use rand::RngCore;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config::{ConfigError, EngineConfig};
use crate::core::context::RenderContext;
use crate::core::substitution::{substitute, Placeholders};
use crate::core::template::{Template, TemplateError};
use crate::schema::category::Category;
use crate::storage::phrase_store::{PhraseStore, SqlitePhraseStore, StoreError};
use crate::storage::registry::{PlaylistRegistry, ServerRegistry};
use crate::storage::selector::ConditionalSelector;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// The top-level resolver. Built via `PhraseEngine::builder()`.
pub struct PhraseEngine {
    store: Box<dyn PhraseStore + Send + Sync>,
    config: EngineConfig,
    servers: Option<ServerRegistry>,
    playlists: Option<PlaylistRegistry>,
}

/// Builder for constructing a `PhraseEngine`.
pub struct PhraseEngineBuilder {
    database: Option<PathBuf>,
    config_path: Option<PathBuf>,
    registries: bool,
    /// Directly provided configuration (skips the config file).
    config: Option<EngineConfig>,
    /// Directly provided store (for testing without a database file).
    store: Option<Box<dyn PhraseStore + Send + Sync>>,
}

impl PhraseEngine {
    pub fn builder() -> PhraseEngineBuilder {
        PhraseEngineBuilder {
            database: None,
            config_path: None,
            registries: false,
            config: None,
            store: None,
        }
    }

    /// Resolve `category` to final text using the thread-local RNG.
    ///
    /// Nothing matching, or an unreachable database, yields an empty string.
    /// Broken templates and schema/argument errors are returned.
    pub fn resolve(
        &self,
        category: &Category,
        context: Option<&RenderContext>,
        extra: Option<&Placeholders>,
    ) -> Result<String, ResolveError> {
        self.resolve_with_rng(category, context, extra, &mut rand::thread_rng())
    }

    /// `resolve` with a caller-supplied RNG.
    pub fn resolve_with_rng(
        &self,
        category: &Category,
        context: Option<&RenderContext>,
        extra: Option<&Placeholders>,
        rng: &mut dyn RngCore,
    ) -> Result<String, ResolveError> {
        let line = match self.select_line(category, rng) {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("resolve(): nothing to say for '{}'", category);
                return Ok(String::new());
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "resolve(): lookup for '{}' failed, staying silent", category);
                return Ok(String::new());
            }
        };
        self.format_with_rng(&line, context, extra, rng)
    }

    /// Render and substitute caller-written text with the same rules as a
    /// stored line.
    pub fn format(
        &self,
        text: &str,
        context: Option<&RenderContext>,
        extra: Option<&Placeholders>,
    ) -> Result<String, ResolveError> {
        self.format_with_rng(text, context, extra, &mut rand::thread_rng())
    }

    pub fn format_with_rng(
        &self,
        text: &str,
        context: Option<&RenderContext>,
        extra: Option<&Placeholders>,
        rng: &mut dyn RngCore,
    ) -> Result<String, ResolveError> {
        let rendered = self.render(text, rng)?;
        Ok(substitute(&rendered, &self.placeholders(context, extra)))
    }

    /// Template rendering only; placeholders are left in place.
    pub fn render(&self, text: &str, rng: &mut dyn RngCore) -> Result<String, TemplateError> {
        Ok(Template::parse(text, &self.config.delimiters)?.render(rng))
    }

    /// Context-derived placeholders with `extra` applied on top.
    pub fn placeholders(
        &self,
        context: Option<&RenderContext>,
        extra: Option<&Placeholders>,
    ) -> Placeholders {
        let empty = RenderContext::default();
        let mut placeholders = Placeholders::from_context(
            &self.config.placeholders,
            context.unwrap_or(&empty),
            &self.config.default_action_marker,
        );
        if let Some(extra) = extra {
            placeholders.merge(extra);
        }
        placeholders
    }

    /// A raw, unrendered line for `category`, falling back to the configured
    /// fallback source when the category matches nothing.
    pub fn select_line(
        &self,
        category: &Category,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, StoreError> {
        let selector = self.selector();

        let line = match self.config.tags_for(category) {
            Some(tags) => selector.line_for_tags(&self.config.source, tags, rng)?,
            None => {
                debug!("select_line(): no tags configured for '{}'", category);
                None
            }
        };

        match (line, &self.config.fallback) {
            (Some(line), _) => Ok(Some(line)),
            (None, Some(fallback)) => selector.any_line(fallback, rng),
            (None, None) => Ok(None),
        }
    }

    pub fn selector(&self) -> ConditionalSelector<'_> {
        ConditionalSelector::new(&*self.store)
    }

    pub fn store(&self) -> &dyn PhraseStore {
        &*self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn servers(&self) -> Option<&ServerRegistry> {
        self.servers.as_ref()
    }

    pub fn playlists(&self) -> Option<&PlaylistRegistry> {
        self.playlists.as_ref()
    }
}

impl PhraseEngineBuilder {
    /// SQLite file holding the phrase table.
    pub fn database(mut self, path: impl AsRef<Path>) -> Self {
        self.database = Some(path.as_ref().to_path_buf());
        self
    }

    /// RON configuration file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Also open the server and playlist registries on the database file.
    pub fn registries(mut self) -> Self {
        self.registries = true;
        self
    }

    /// Provide configuration directly.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Provide a store directly (for testing without a database file).
    pub fn with_store(mut self, store: Box<dyn PhraseStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<PhraseEngine, ResolveError> {
        let config = match (self.config, &self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(path)?,
            (None, None) => EngineConfig::default(),
        };

        let store: Box<dyn PhraseStore + Send + Sync> = match (self.store, &self.database) {
            (Some(store), _) => store,
            (None, Some(path)) => Box::new(SqlitePhraseStore::new(path)),
            (None, None) => {
                return Err(ConfigError::Invalid("no phrase database or store given".to_string()).into())
            }
        };

        let (servers, playlists) = match (self.registries, &self.database) {
            (true, Some(path)) => (
                Some(ServerRegistry::open(path)?),
                Some(PlaylistRegistry::open(path)?),
            ),
            (true, None) => {
                return Err(
                    ConfigError::Invalid("registries need a database file".to_string()).into(),
                )
            }
            (false, _) => (None, None),
        };

        Ok(PhraseEngine {
            store,
            config,
            servers,
            playlists,
        })
    }
}
