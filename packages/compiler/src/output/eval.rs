//! Render DSL Evaluator
//!
//! Walks a parsed render expression against a data context and produces
//! virtual nodes. Identifiers resolve through list-iteration scopes first,
//! then the context's top-level fields; anything missing reads as null so
//! a sparse data object degrades instead of aborting the whole render.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use thiserror::Error;

use super::expr::{BinaryOp, Expr, UnaryOp};
use crate::vdom::{RenderContext, VNode};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown render helper `{0}`")]
    UnknownHelper(String),
    #[error("expression is not callable")]
    NotCallable,
    #[error("helper `{helper}` expects {expected}")]
    HelperArity {
        helper: &'static str,
        expected: &'static str,
    },
    #[error("static tree index {0} out of range")]
    StaticIndex(usize),
    #[error("type error: {0}")]
    Type(String),
}

/// Result of evaluating one expression: either plain data or rendered
/// node(s). Helper calls produce nodes; everything else produces values.
#[derive(Debug, Clone)]
pub enum RVal {
    Value(Value),
    Node(VNode),
    Nodes(Vec<VNode>),
}

/// Evaluation environment for one render invocation.
pub struct Env<'a> {
    ctx: &'a RenderContext,
    statics: &'a [Expr],
    static_cache: &'a [OnceCell<VNode>],
    scopes: Vec<HashMap<String, Value>>,
}

impl<'a> Env<'a> {
    pub fn new(
        ctx: &'a RenderContext,
        statics: &'a [Expr],
        static_cache: &'a [OnceCell<VNode>],
    ) -> Self {
        Env {
            ctx,
            statics,
            static_cache,
            scopes: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Value {
        for frame in self.scopes.iter().rev() {
            if let Some(value) = frame.get(name) {
                return value.clone();
            }
        }
        self.ctx.get(name).cloned().unwrap_or(Value::Null)
    }
}

/// Evaluate a render expression expected to produce one root node.
pub fn evaluate_root(expr: &Expr, env: &mut Env) -> Result<VNode, RenderError> {
    match evaluate(expr, env)? {
        RVal::Node(node) => Ok(node),
        RVal::Nodes(mut nodes) if nodes.len() == 1 => Ok(nodes.remove(0)),
        RVal::Nodes(nodes) if nodes.is_empty() => Ok(VNode::empty()),
        RVal::Nodes(_) => Err(RenderError::Type(
            "render produced multiple root nodes".to_string(),
        )),
        RVal::Value(_) => Err(RenderError::Type(
            "render produced a plain value instead of a node".to_string(),
        )),
    }
}

pub fn evaluate(expr: &Expr, env: &mut Env) -> Result<RVal, RenderError> {
    match expr {
        Expr::Str(s) => Ok(RVal::Value(Value::String(s.clone()))),
        Expr::Num(n) => Ok(RVal::Value(make_number(*n))),
        Expr::Bool(b) => Ok(RVal::Value(Value::Bool(*b))),
        Expr::Null | Expr::Undefined => Ok(RVal::Value(Value::Null)),
        Expr::Ident(name) => Ok(RVal::Value(env.lookup(name))),
        Expr::Array(elements) => eval_array(elements, env),
        Expr::Object(entries) => {
            let mut map = Map::new();
            for (key, value_expr) in entries {
                map.insert(key.clone(), eval_value(value_expr, env)?);
            }
            Ok(RVal::Value(Value::Object(map)))
        }
        Expr::Member { object, property } => {
            let object = eval_value(object, env)?;
            Ok(RVal::Value(
                object.get(property).cloned().unwrap_or(Value::Null),
            ))
        }
        Expr::Index { object, index } => {
            let object = eval_value(object, env)?;
            let index = eval_value(index, env)?;
            let out = match (&object, &index) {
                (Value::Array(items), Value::Number(n)) => n
                    .as_u64()
                    .and_then(|i| items.get(i as usize))
                    .cloned()
                    .unwrap_or(Value::Null),
                (_, Value::String(key)) => object.get(key).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            };
            Ok(RVal::Value(out))
        }
        Expr::Call { callee, args } => match callee.as_ref() {
            Expr::Ident(name) if name.starts_with('_') => call_helper(name, args, env),
            _ => Err(RenderError::NotCallable),
        },
        Expr::Unary { op, operand } => {
            let value = eval_value(operand, env)?;
            let out = match op {
                UnaryOp::Not => Value::Bool(!truthy(&value)),
                UnaryOp::Neg => make_number(-to_number(&value)?),
            };
            Ok(RVal::Value(out))
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, env),
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            let cond = eval_value(cond, env)?;
            if truthy(&cond) {
                evaluate(then, env)
            } else {
                evaluate(otherwise, env)
            }
        }
        Expr::Function { .. } => Err(RenderError::Type(
            "function literal outside a list helper".to_string(),
        )),
    }
}

fn eval_value(expr: &Expr, env: &mut Env) -> Result<Value, RenderError> {
    match evaluate(expr, env)? {
        RVal::Value(value) => Ok(value),
        _ => Err(RenderError::Type("expected a plain value".to_string())),
    }
}

/// Arrays holding only values stay values; arrays holding nodes flatten
/// into a node list. Mixing the two is malformed output.
fn eval_array(elements: &[Expr], env: &mut Env) -> Result<RVal, RenderError> {
    let mut values = Vec::new();
    let mut nodes = Vec::new();
    for element in elements {
        match evaluate(element, env)? {
            RVal::Value(v) => values.push(v),
            RVal::Node(n) => nodes.push(n),
            RVal::Nodes(ns) => nodes.extend(ns),
        }
    }
    if nodes.is_empty() {
        Ok(RVal::Value(Value::Array(values)))
    } else if values.is_empty() {
        Ok(RVal::Nodes(nodes))
    } else {
        Err(RenderError::Type(
            "array mixes nodes and plain values".to_string(),
        ))
    }
}

fn call_helper(name: &str, args: &[Expr], env: &mut Env) -> Result<RVal, RenderError> {
    match name {
        "_c" => helper_create_element(args, env),
        "_v" => {
            let [arg] = args else {
                return Err(RenderError::HelperArity {
                    helper: "_v",
                    expected: "one argument",
                });
            };
            let value = eval_value(arg, env)?;
            Ok(RVal::Node(VNode::text(display(&value))))
        }
        "_r" => {
            let [arg] = args else {
                return Err(RenderError::HelperArity {
                    helper: "_r",
                    expected: "one argument",
                });
            };
            let value = eval_value(arg, env)?;
            Ok(RVal::Node(VNode::raw(display(&value))))
        }
        "_s" => {
            let [arg] = args else {
                return Err(RenderError::HelperArity {
                    helper: "_s",
                    expected: "one argument",
                });
            };
            let value = eval_value(arg, env)?;
            Ok(RVal::Value(Value::String(display(&value))))
        }
        "_e" => match args {
            [] => Ok(RVal::Node(VNode::empty())),
            [arg] => {
                let value = eval_value(arg, env)?;
                Ok(RVal::Node(VNode::comment(display(&value))))
            }
            _ => Err(RenderError::HelperArity {
                helper: "_e",
                expected: "at most one argument",
            }),
        },
        "_m" => helper_static(args, env),
        "_l" => helper_list(args, env),
        "_t" => helper_slot(args, env),
        other => Err(RenderError::UnknownHelper(other.to_string())),
    }
}

fn helper_create_element(args: &[Expr], env: &mut Env) -> Result<RVal, RenderError> {
    let Some((tag_expr, rest)) = args.split_first() else {
        return Err(RenderError::HelperArity {
            helper: "_c",
            expected: "a tag name",
        });
    };
    let tag = match eval_value(tag_expr, env)? {
        Value::String(tag) => tag,
        _ => {
            return Err(RenderError::Type(
                "element tag must be a string".to_string(),
            ))
        }
    };
    let mut data = None;
    let mut children = Vec::new();
    for arg in rest {
        match evaluate(arg, env)? {
            RVal::Value(Value::Object(map)) => data = Some(Value::Object(map)),
            RVal::Value(Value::Null) => {}
            RVal::Value(Value::Array(items)) if items.is_empty() => {}
            RVal::Node(node) => children.push(node),
            RVal::Nodes(nodes) => children.extend(nodes),
            RVal::Value(_) => {
                return Err(RenderError::Type(
                    "element argument must be a data object or children".to_string(),
                ))
            }
        }
    }
    Ok(RVal::Node(VNode::element(tag, data, children)))
}

/// `_m(i)`: hoisted static trees render at most once per function set; the
/// cached node is cloned on every later render.
fn helper_static(args: &[Expr], env: &mut Env) -> Result<RVal, RenderError> {
    let [Expr::Num(index)] = args else {
        return Err(RenderError::HelperArity {
            helper: "_m",
            expected: "a literal index",
        });
    };
    let index = *index as usize;
    let cell = env
        .static_cache
        .get(index)
        .ok_or(RenderError::StaticIndex(index))?;
    if let Some(cached) = cell.get() {
        return Ok(RVal::Node(cached.clone()));
    }
    let static_expr = env
        .statics
        .get(index)
        .ok_or(RenderError::StaticIndex(index))?;
    let node = evaluate_root(static_expr, env)?;
    let _ = cell.set(node.clone());
    Ok(RVal::Node(node))
}

fn helper_list(args: &[Expr], env: &mut Env) -> Result<RVal, RenderError> {
    let [iterable_expr, Expr::Function { params, body }] = args else {
        return Err(RenderError::HelperArity {
            helper: "_l",
            expected: "an iterable and a body function",
        });
    };
    let iterable = eval_value(iterable_expr, env)?;

    // (item, iterator1, iterator2) triples per iteration.
    let bindings: Vec<Vec<Value>> = match &iterable {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| vec![item.clone(), Value::from(i)])
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| vec![Value::String(c.to_string()), Value::from(i)])
            .collect(),
        Value::Number(n) => match n.as_u64() {
            Some(count) => (1..=count)
                .map(|i| vec![Value::from(i), Value::from(i - 1)])
                .collect(),
            None => Vec::new(),
        },
        Value::Object(map) => map
            .iter()
            .enumerate()
            .map(|(i, (key, value))| {
                vec![value.clone(), Value::String(key.clone()), Value::from(i)]
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut out = Vec::new();
    for binding in bindings {
        let mut frame = HashMap::new();
        for (param, value) in params.iter().zip(binding) {
            frame.insert(param.clone(), value);
        }
        env.scopes.push(frame);
        let result = evaluate(body, env);
        env.scopes.pop();
        match result? {
            RVal::Node(node) => out.push(node),
            RVal::Nodes(nodes) => out.extend(nodes),
            RVal::Value(_) => {
                return Err(RenderError::Type(
                    "list body must produce nodes".to_string(),
                ))
            }
        }
    }
    Ok(RVal::Nodes(out))
}

/// Slot outlets render their fallback content; there is no enclosing
/// component to inject anything else here.
fn helper_slot(args: &[Expr], env: &mut Env) -> Result<RVal, RenderError> {
    let Some((_name, rest)) = args.split_first() else {
        return Err(RenderError::HelperArity {
            helper: "_t",
            expected: "a slot name",
        });
    };
    match rest {
        [] => Ok(RVal::Node(VNode::empty())),
        [fallback] => match evaluate(fallback, env)? {
            RVal::Nodes(nodes) => Ok(RVal::Nodes(nodes)),
            RVal::Node(node) => Ok(RVal::Node(node)),
            RVal::Value(_) => Err(RenderError::Type(
                "slot fallback must produce nodes".to_string(),
            )),
        },
        _ => Err(RenderError::HelperArity {
            helper: "_t",
            expected: "a name and optional fallback",
        }),
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    env: &mut Env,
) -> Result<RVal, RenderError> {
    // Short-circuit forms yield the deciding operand, not a coerced bool.
    if op == BinaryOp::And {
        let l = eval_value(left, env)?;
        return if truthy(&l) {
            Ok(RVal::Value(eval_value(right, env)?))
        } else {
            Ok(RVal::Value(l))
        };
    }
    if op == BinaryOp::Or {
        let l = eval_value(left, env)?;
        return if truthy(&l) {
            Ok(RVal::Value(l))
        } else {
            Ok(RVal::Value(eval_value(right, env)?))
        };
    }

    let l = eval_value(left, env)?;
    let r = eval_value(right, env)?;
    let out = match op {
        BinaryOp::Add => {
            if l.is_string() || r.is_string() {
                Value::String(format!("{}{}", display(&l), display(&r)))
            } else {
                make_number(to_number(&l)? + to_number(&r)?)
            }
        }
        BinaryOp::Sub => make_number(to_number(&l)? - to_number(&r)?),
        BinaryOp::Mul => make_number(to_number(&l)? * to_number(&r)?),
        BinaryOp::Div => make_number(to_number(&l)? / to_number(&r)?),
        BinaryOp::Rem => make_number(to_number(&l)? % to_number(&r)?),
        BinaryOp::Eq | BinaryOp::StrictEq => Value::Bool(values_equal(&l, &r)),
        BinaryOp::NotEq | BinaryOp::StrictNotEq => Value::Bool(!values_equal(&l, &r)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            Value::Bool(compare(op, &l, &r)?)
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    };
    Ok(RVal::Value(out))
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<bool, RenderError> {
    let ordering = match (l, r) {
        (Value::Number(_), Value::Number(_)) => {
            let (a, b) = (to_number(l)?, to_number(r)?);
            a.partial_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(RenderError::Type(format!(
                "cannot order {} against {}",
                type_name(l),
                type_name(r)
            )))
        }
    };
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::LtEq => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::GtEq => ordering.is_ge(),
        _ => false,
    })
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        // Numeric equality ignores the integer/float representation split.
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => l == r,
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a value in rendered output: null disappears, strings pass
/// through, composites pretty-print.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
    }
}

fn to_number(value: &Value) -> Result<f64, RenderError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            RenderError::Type("number is not representable as f64".to_string())
        }),
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RenderError::Type(format!("`{}` is not a number", s))),
        other => Err(RenderError::Type(format!(
            "{} is not a number",
            type_name(other)
        ))),
    }
}

fn make_number(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
