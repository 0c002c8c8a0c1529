//! Baseline Compile Pipeline
//!
//! `base_compile` wires parser, optimizer and generator into the platform
//! agnostic core routine; `create_compiler` bakes it together with the
//! default modules and directive hooks into a ready-to-use facade.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::codegen::{self, directives::base_directives};
use crate::create_compiler::{create_compiler_creator, CompiledResult, Compiler, CoreCompileFn};
use crate::modules::base_modules;
use crate::optimizer::optimize;
use crate::options::{CompilerOptions, CompilerOptionsOverride};
use crate::parser;
use crate::to_function::CompiledFunctions;

/// Parse, optionally optimize, and generate render source for a template.
pub fn base_compile(template: &str, options: &CompilerOptions) -> CompiledResult {
    let mut parsed = parser::parse(template.trim(), options);
    if options.optimize {
        if let Some(root) = parsed.root.as_mut() {
            optimize(root, options);
        }
    }
    let generated = codegen::generate(parsed.root.as_ref(), options);

    let mut errors = parsed.errors;
    errors.extend(generated.errors);
    let mut tips = parsed.tips;
    tips.extend(generated.tips);
    CompiledResult {
        ast: parsed.root,
        render: generated.render,
        static_render_fns: generated.static_render_fns,
        errors,
        tips,
    }
}

/// Base options with the stock modules and directive hooks installed.
pub fn base_options() -> CompilerOptions {
    CompilerOptions {
        modules: base_modules(),
        directives: base_directives(),
        ..CompilerOptions::default()
    }
}

/// Build a compiler around `base_compile` with the given base options.
pub fn create_compiler(base: CompilerOptions) -> Compiler {
    let core: CoreCompileFn = Arc::new(|template, options| base_compile(template, options));
    create_compiler_creator(core)(base)
}

static DEFAULT_COMPILER: Lazy<Compiler> = Lazy::new(|| create_compiler(base_options()));

/// Compile with the default compiler.
pub fn compile(template: &str, overrides: &CompilerOptionsOverride) -> CompiledResult {
    DEFAULT_COMPILER.compile(template, overrides)
}

/// Compile to callable functions with the default compiler. Results are
/// cached process-wide per options signature and template.
pub fn compile_to_functions(
    template: &str,
    overrides: &CompilerOptionsOverride,
) -> Arc<CompiledFunctions> {
    DEFAULT_COMPILER.compile_to_functions(template, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_is_trimmed_before_parsing() {
        let result = base_compile("  <div>hi</div>\n", &base_options());
        assert!(result.errors.is_empty());
        // Fully static tree: the whole thing hoists.
        assert_eq!(result.render, "_m(0)");
        assert_eq!(result.static_render_fns, vec!["_c(\"div\",[_v(\"hi\")])"]);
    }

    #[test]
    fn test_optimize_off_hoists_nothing() {
        let options = CompilerOptions {
            optimize: false,
            ..base_options()
        };
        let result = base_compile("<div><p><span>a</span></p></div>", &options);
        assert!(result.static_render_fns.is_empty());
        assert!(!result.render.contains("_m("));
    }
}
