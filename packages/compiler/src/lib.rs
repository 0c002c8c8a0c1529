#![deny(clippy::all)]

/**
 * Trellis Template Compiler
 *
 * Compiles HTML-flavored templates into callable render functions:
 * parse to an annotated AST, mark static subtrees, generate render
 * source, then reconstitute and cache the callable function set.
 */

pub mod codegen;
pub mod compiler;
pub mod create_compiler;
pub mod modules;
pub mod optimizer;
pub mod options;
pub mod output;
pub mod parse_util;
pub mod parser;
pub mod to_function;
pub mod vdom;

pub use compiler::{base_compile, base_options, compile, compile_to_functions, create_compiler};
pub use create_compiler::{create_compiler_creator, CompiledResult, Compiler, CoreCompileFn};
pub use options::{merge_options, CompilerOptions, CompilerOptionsOverride, WhitespaceMode};
pub use parse_util::{CompileDiagnostic, DiagnosticLevel, SourceSpan};
pub use to_function::{CompileCache, CompiledFunctions};
pub use vdom::{RenderContext, RenderFn, VNode};
