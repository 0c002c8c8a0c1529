//! Compiler Facade
//!
//! A `Compiler` pairs a core compile routine with a frozen set of base
//! options, a function-constructor step, and a memoizing cache. Platforms
//! bake their defaults in once via `create_compiler_creator`; callers then
//! pass only per-compile overrides.

use std::sync::Arc;

use crate::options::{merge_options, CompilerOptions, CompilerOptionsOverride};
use crate::parse_util::CompileDiagnostic;
use crate::parser::ast::Element;
use crate::to_function::{noop_render, to_functions, CompileCache, CompiledFunctions};

/// Output of the core compile pipeline: source text plus diagnostics,
/// before any function construction.
pub struct CompiledResult {
    pub ast: Option<Element>,
    pub render: String,
    pub static_render_fns: Vec<String>,
    pub errors: Vec<CompileDiagnostic>,
    pub tips: Vec<CompileDiagnostic>,
}

/// The core template-to-source routine a compiler is built around.
pub type CoreCompileFn = Arc<dyn Fn(&str, &CompilerOptions) -> CompiledResult + Send + Sync>;

pub struct Compiler {
    base_options: CompilerOptions,
    core: CoreCompileFn,
    cache: CompileCache,
}

impl Compiler {
    pub fn base_options(&self) -> &CompilerOptions {
        &self.base_options
    }

    /// Compile to render source. Caller overrides merge over the base
    /// options; the cache is not involved at this level.
    pub fn compile(&self, template: &str, overrides: &CompilerOptionsOverride) -> CompiledResult {
        let merged = merge_options(&self.base_options, overrides);
        (self.core)(template, &merged)
    }

    /// Compile to callable render functions, memoized per options
    /// signature and template source. Repeat calls with an equivalent
    /// configuration return the same `Arc`.
    pub fn compile_to_functions(
        &self,
        template: &str,
        overrides: &CompilerOptionsOverride,
    ) -> Arc<CompiledFunctions> {
        let merged = merge_options(&self.base_options, overrides);
        let key = CompileCache::cache_key(&merged.output_signature(), template);
        if let Some(hit) = self.cache.lookup(&key) {
            return hit;
        }

        let compiled = (self.core)(template, &merged);
        let mut errors = compiled.errors;
        let tips = compiled.tips;
        let funcs = match to_functions(&compiled.render, &compiled.static_render_fns) {
            Ok((render, static_render_fns)) => CompiledFunctions {
                render,
                static_render_fns,
                errors,
                tips,
            },
            Err(err) => {
                if self.cache.warn_once(&key) {
                    tracing::warn!(
                        template,
                        error = %err,
                        "failed to reconstitute render functions"
                    );
                }
                errors.push(CompileDiagnostic::error(
                    format!("failed to construct render function: {}", err),
                    None,
                ));
                CompiledFunctions {
                    render: noop_render(),
                    static_render_fns: Vec::new(),
                    errors,
                    tips,
                }
            }
        };

        let funcs = Arc::new(funcs);
        self.cache.store(key, Arc::clone(&funcs));
        funcs
    }
}

/// Bake a core compile routine into a compiler factory. Each produced
/// compiler owns its base options and its own cache.
pub fn create_compiler_creator(core: CoreCompileFn) -> impl Fn(CompilerOptions) -> Compiler {
    move |base_options| Compiler {
        base_options,
        core: Arc::clone(&core),
        cache: CompileCache::new(),
    }
}
