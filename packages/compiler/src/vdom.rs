//! Virtual Node Output
//!
//! The structured tree a reconstituted render routine produces when
//! invoked against a data context. Renderers consume this; the compiler
//! itself never interprets it further.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::output::eval::RenderError;

/// One node of rendered output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VNode {
    Element {
        tag: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        children: Vec<VNode>,
    },
    Text {
        text: String,
    },
    /// Markup trusted verbatim; produced by raw interpolation.
    Raw {
        html: String,
    },
    /// Comment or placeholder node. An empty placeholder is what a failed
    /// conditional branch renders.
    Empty {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl VNode {
    pub fn element(tag: impl Into<String>, data: Option<Value>, children: Vec<VNode>) -> Self {
        VNode::Element {
            tag: tag.into(),
            data,
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text { text: text.into() }
    }

    pub fn raw(html: impl Into<String>) -> Self {
        VNode::Raw { html: html.into() }
    }

    pub fn empty() -> Self {
        VNode::Empty { text: None }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        VNode::Empty {
            text: Some(text.into()),
        }
    }

    /// The render key attached to this node, if any.
    pub fn key(&self) -> Option<&Value> {
        match self {
            VNode::Element {
                data: Some(data), ..
            } => data.get("key"),
            _ => None,
        }
    }
}

/// Data context a render routine evaluates against. Identifier lookups in
/// render expressions resolve against the top-level fields of `data`.
#[derive(Debug, Clone)]
pub struct RenderContext {
    data: Value,
}

impl RenderContext {
    pub fn new(data: Value) -> Self {
        RenderContext { data }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// A reconstituted render routine.
pub type RenderFn = Arc<dyn Fn(&RenderContext) -> Result<VNode, RenderError> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_reads_from_element_data() {
        let node = VNode::element("li", Some(json!({"key": 3})), vec![]);
        assert_eq!(node.key(), Some(&json!(3)));
        assert_eq!(VNode::text("x").key(), None);
    }

    #[test]
    fn test_serializes_with_tagged_type() {
        let node = VNode::element("div", None, vec![VNode::text("hi")]);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "element");
        assert_eq!(json["children"][0]["text"], "hi");
    }
}
