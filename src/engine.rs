//! The generation pipeline: cache → resolve → bind → render → cache.

use crate::binder::bind;
use crate::cache::{CacheKey, ResolutionCache};
use crate::config::EngineConfig;
use crate::context::RenderContext;
use crate::error::{Error, GenerationError, Result};
use crate::renderer::{BlockRenderer, RenderedDocument, TemplateRenderer};
use crate::request::{RenderOutput, ResolutionRequest, Strictness};
use crate::resolver::{builtin_default, FallbackStep, TemplateResolver};
use crate::store::TemplateStore;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
struct Loaded {
    store: Arc<TemplateStore>,
    generation: u64,
}

/// Owns the current template store and renders requests against it.
///
/// Readers take an `Arc` snapshot of the store, so a reload never exposes a
/// half-built index. Outputs rendered against a store that was replaced in
/// the meantime are not cached.
pub struct Engine {
    root: PathBuf,
    config: EngineConfig,
    loaded: RwLock<Loaded>,
    cache: Arc<ResolutionCache>,
    renderer: Box<dyn TemplateRenderer>,
}

impl Engine {
    /// Loads the configuration and templates under `root`, with a fresh cache.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let config = EngineConfig::load(root)?;
        let cache = Arc::new(ResolutionCache::with_ttl_secs(config.cache_ttl_secs));
        Self::load_with_cache(root, config, cache)
    }

    /// Loads templates under `root` using a caller-owned cache.
    pub fn load_with_cache<P: AsRef<Path>>(
        root: P,
        config: EngineConfig,
        cache: Arc<ResolutionCache>,
    ) -> Result<Self> {
        let root = root.as_ref();
        let store = TemplateStore::load(root, &config)?;
        let mut engine = Self::new(store, config, cache);
        engine.root = root.to_path_buf();
        Ok(engine)
    }

    /// Wraps an already built store. Such an engine has no root to reload from
    /// unless the store itself was loaded from disk.
    pub fn new(store: TemplateStore, config: EngineConfig, cache: Arc<ResolutionCache>) -> Self {
        let renderer = Box::new(BlockRenderer::new(config.section_separator.clone()));
        Self {
            root: store.root().to_path_buf(),
            config,
            loaded: RwLock::new(Loaded { store: Arc::new(store), generation: 0 }),
            cache,
            renderer,
        }
    }

    /// Replaces the section renderer, for both regular and degraded output.
    pub fn with_renderer(mut self, renderer: Box<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of the current store.
    pub fn store(&self) -> Arc<TemplateStore> {
        Arc::clone(&self.loaded.read().store)
    }

    /// Builds a request using the configured default strictness.
    pub fn request(&self, platform: &str, document_type: &str, tech_stack: &str) -> ResolutionRequest {
        ResolutionRequest::new(platform, document_type, tech_stack)
            .with_strictness(self.config.default_strictness)
    }

    /// Renders `request` against `context`.
    ///
    /// Render-time failures are returned with the template id and fallback
    /// path, plus the built-in default's output when `degraded_fallback` is on.
    pub fn generate(
        &self,
        request: &ResolutionRequest,
        context: &RenderContext,
    ) -> Result<RenderOutput, GenerationError> {
        let key = CacheKey::new(request, context);
        if let Some(output) = self.cache.get(&key) {
            debug!("Cache hit for {request}");
            return Ok(output);
        }

        let (store, generation) = {
            let loaded = self.loaded.read();
            (Arc::clone(&loaded.store), loaded.generation)
        };

        let resolution = TemplateResolver::new(&store)
            .resolve(request)
            .map_err(|err| self.degrade(err, context))?;

        let bindings = bind(context.value(), &resolution.merged.variables, request.strictness);
        let document = self.renderer.render(&resolution.merged, &bindings).map_err(|error| {
            self.degrade(
                GenerationError {
                    error,
                    template_id: resolution.merged.id.clone(),
                    fallback_path: resolution.fallback_path.clone(),
                    degraded: None,
                },
                context,
            )
        })?;

        let output = into_output(document, resolution.merged.id, resolution.fallback_path);
        let loaded = self.loaded.read();
        if loaded.generation == generation {
            self.cache.put(key, output.clone());
        } else {
            debug!("Store reloaded while rendering {request}, not caching");
        }
        Ok(output)
    }

    /// Attaches the built-in default's output to `err` when configured to.
    fn degrade(&self, mut err: GenerationError, context: &RenderContext) -> GenerationError {
        if !self.config.degraded_fallback {
            return err;
        }
        warn!("{err}; falling back to the built-in default");

        let merged = builtin_default();
        let bindings = bind(context.value(), &merged.variables, Strictness::Lenient);
        match self.renderer.render(&merged, &bindings) {
            Ok(document) => {
                let mut path = err.fallback_path.clone();
                path.push(FallbackStep::Builtin.label(true));
                err.degraded = Some(into_output(document, merged.id, path));
            }
            Err(e) => warn!("Built-in default failed to render: {e}"),
        }
        err
    }

    /// Loads a fresh store from the root and swaps it in, clearing the cache.
    /// On failure the current store stays in place.
    pub fn reload(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::Other(anyhow::anyhow!(
                "templates were not loaded from disk, there is nothing to reload"
            )));
        }
        let store = TemplateStore::load(&self.root, &self.config)?;
        let mut loaded = self.loaded.write();
        loaded.store = Arc::new(store);
        loaded.generation += 1;
        self.cache.invalidate_all();
        info!("Reloaded templates from {} (generation {})", self.root.display(), loaded.generation);
        Ok(())
    }

    /// Reloads when files under the root changed since the last load.
    pub fn reload_if_changed(&self) -> Result<bool> {
        if !self.store().is_stale()? {
            return Ok(false);
        }
        debug!("Template files under {} changed", self.root.display());
        self.reload()?;
        Ok(true)
    }
}

fn into_output(document: RenderedDocument, template_id: String, path: Vec<String>) -> RenderOutput {
    RenderOutput {
        rendered_text: document.text,
        template_id,
        fallback_path_taken: path,
        warnings: document.warnings,
        sections: document.sections,
    }
}
