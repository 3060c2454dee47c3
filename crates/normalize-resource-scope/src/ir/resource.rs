//! Scoped-resource statement nodes.
//!
//! Pure data: a statement owns its items and body, items are listed in
//! acquisition order. Validation happens during lowering, never here.

use super::{Expr, Stmt};
use serde::{Deserialize, Serialize};

/// Shape an entry value is bound to: a single name, or an ordered tuple of
/// sub-patterns (`as (a, (b, c))`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingPattern {
    Name(String),
    Tuple(Vec<BindingPattern>),
}

impl BindingPattern {
    pub fn name(name: impl Into<String>) -> Self {
        BindingPattern::Name(name.into())
    }

    pub fn tuple(slots: Vec<BindingPattern>) -> Self {
        BindingPattern::Tuple(slots)
    }

    /// Flat tuple of names.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BindingPattern::Tuple(names.into_iter().map(BindingPattern::name).collect())
    }
}

/// One entry of a scoped statement's item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceItem {
    /// Expression producing the resource (context manager).
    pub acquire: Expr,
    /// Alias the entry value is bound to; `None` discards it.
    pub binding: Option<BindingPattern>,
    /// Number of values the entry handler is known to yield, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_arity: Option<usize>,
}

impl ResourceItem {
    pub fn new(acquire: Expr) -> Self {
        Self {
            acquire,
            binding: None,
            entry_arity: None,
        }
    }

    pub fn bind(mut self, pattern: BindingPattern) -> Self {
        self.binding = Some(pattern);
        self
    }

    pub fn with_entry_arity(mut self, arity: usize) -> Self {
        self.entry_arity = Some(arity);
        self
    }
}

/// `with r1 as a, r2 as (b, c), r3: body` (or `async with`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedStatement {
    pub items: Vec<ResourceItem>,
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub is_async: bool,
}

impl ScopedStatement {
    pub fn new(items: Vec<ResourceItem>, body: Vec<Stmt>) -> Self {
        Self {
            items,
            body,
            is_async: false,
        }
    }

    pub fn new_async(items: Vec<ResourceItem>, body: Vec<Stmt>) -> Self {
        Self {
            items,
            body,
            is_async: true,
        }
    }
}
