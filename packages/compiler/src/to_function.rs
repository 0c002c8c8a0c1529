//! Function Constructor and Compile Cache
//!
//! Turns generated render source into callable `RenderFn` closures and
//! memoizes whole function sets per (options signature, template) key.
//! Construction failure never panics the caller: the result degrades to a
//! no-op render plus a diagnostic, reported once per offending source.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::output::eval::{self, Env};
use crate::output::expr::{self, Expr, ExprError};
use crate::parse_util::CompileDiagnostic;
use crate::vdom::{RenderFn, VNode};

/// A reconstituted function set for one template.
pub struct CompiledFunctions {
    pub render: RenderFn,
    pub static_render_fns: Vec<RenderFn>,
    pub errors: Vec<CompileDiagnostic>,
    pub tips: Vec<CompileDiagnostic>,
}

/// Render that produces nothing; stands in when construction fails.
pub fn noop_render() -> RenderFn {
    Arc::new(|_| Ok(VNode::empty()))
}

/// Build callables from render source. All sources are parsed up front;
/// a parse failure in any of them fails the whole set.
pub fn to_functions(
    render_src: &str,
    static_srcs: &[String],
) -> Result<(RenderFn, Vec<RenderFn>), ExprError> {
    let render_expr = Arc::new(expr::parse_expr(render_src)?);
    let statics: Arc<Vec<Expr>> = Arc::new(
        static_srcs
            .iter()
            .map(|src| expr::parse_expr(src))
            .collect::<Result<_, _>>()?,
    );
    // One cache cell per static tree, shared by every closure in the set.
    let static_cache: Arc<Vec<OnceCell<VNode>>> =
        Arc::new((0..statics.len()).map(|_| OnceCell::new()).collect());

    let render: RenderFn = {
        let statics = Arc::clone(&statics);
        let static_cache = Arc::clone(&static_cache);
        Arc::new(move |ctx| {
            let mut env = Env::new(ctx, &statics, &static_cache);
            eval::evaluate_root(&render_expr, &mut env)
        })
    };

    let static_render_fns: Vec<RenderFn> = (0..statics.len())
        .map(|index| {
            let statics = Arc::clone(&statics);
            let static_cache = Arc::clone(&static_cache);
            let static_fn: RenderFn = Arc::new(move |ctx| {
                let mut env = Env::new(ctx, &statics, &static_cache);
                eval::evaluate_root(&statics[index], &mut env)
            });
            static_fn
        })
        .collect();

    Ok((render, static_render_fns))
}

/// Memoizes function sets across compiles. Keys combine the output
/// signature of the options with the template source, so the same template
/// under different delimiters or modules caches separately.
pub struct CompileCache {
    entries: Mutex<HashMap<String, Arc<CompiledFunctions>>>,
    warned: Mutex<HashSet<String>>,
}

impl CompileCache {
    pub fn new() -> Self {
        CompileCache {
            entries: Mutex::new(HashMap::new()),
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn cache_key(signature: &str, template: &str) -> String {
        format!("{}\u{0}{}", signature, template)
    }

    pub fn lookup(&self, key: &str) -> Option<Arc<CompiledFunctions>> {
        match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(_) => None,
        }
    }

    pub fn store(&self, key: String, value: Arc<CompiledFunctions>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, value);
        }
    }

    /// Drop all cached function sets and warning dedup state.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
        if let Ok(mut warned) = self.warned.lock() {
            warned.clear();
        }
    }

    /// True the first time this key is seen; later calls return false so
    /// a broken template warns once, not on every compile attempt.
    pub fn warn_once(&self, key: &str) -> bool {
        match self.warned.lock() {
            Ok(mut warned) => warned.insert(key.to_string()),
            Err(_) => false,
        }
    }
}

impl Default for CompileCache {
    fn default() -> Self {
        CompileCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::RenderContext;
    use serde_json::json;

    #[test]
    fn test_noop_render_produces_empty_node() {
        let render = noop_render();
        let node = render(&RenderContext::new(json!({}))).unwrap();
        assert_eq!(node, VNode::empty());
    }

    #[test]
    fn test_static_trees_render_once_and_are_shared() {
        let (render, static_fns) = to_functions(
            "_c(\"div\",[_m(0),_v(_s(msg))])",
            &["_c(\"h1\",[_v(\"Static\")])".to_string()],
        )
        .unwrap();
        assert_eq!(static_fns.len(), 1);

        let ctx = RenderContext::new(json!({"msg": "a"}));
        let first = render(&ctx).unwrap();
        let again = render(&RenderContext::new(json!({"msg": "b"}))).unwrap();
        match (first, again) {
            (VNode::Element { children: a, .. }, VNode::Element { children: b, .. }) => {
                // The hoisted subtree is identical across renders while the
                // dynamic text tracks the context.
                assert_eq!(a[0], b[0]);
                assert_eq!(a[1], VNode::text("a"));
                assert_eq!(b[1], VNode::text("b"));
            }
            other => panic!("expected elements, got {:?}", other),
        }
    }

    #[test]
    fn test_broken_source_fails_construction() {
        assert!(to_functions("_v((1 + ))", &[]).is_err());
    }

    #[test]
    fn test_cache_round_trip_and_warn_dedup() {
        let cache = CompileCache::new();
        let key = CompileCache::cache_key("{}", "<div/>");
        assert!(cache.lookup(&key).is_none());

        let funcs = Arc::new(CompiledFunctions {
            render: noop_render(),
            static_render_fns: Vec::new(),
            errors: Vec::new(),
            tips: Vec::new(),
        });
        cache.store(key.clone(), Arc::clone(&funcs));
        let hit = cache.lookup(&key).unwrap();
        assert!(Arc::ptr_eq(&hit, &funcs));

        assert!(cache.warn_once(&key));
        assert!(!cache.warn_once(&key));
    }
}
