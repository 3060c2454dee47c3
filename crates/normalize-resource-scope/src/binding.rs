//! Binding resolution for resource items.
//!
//! Works out which names an item's entry value introduces into the body's
//! scope, and rejects patterns that cannot be emitted faithfully.

use crate::error::LowerError;
use crate::ir::{BindingPattern, Expr, ResourceItem, Stmt};
use std::collections::HashSet;
use std::fmt;

/// Normalized binding of one resource item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    /// `None` when the entry value is discarded.
    pub pattern: Option<BindingPattern>,
    /// Names bound in the body's scope, in slot order.
    pub names: Vec<String>,
}

impl ResolvedBinding {
    pub fn is_discarded(&self) -> bool {
        self.pattern.is_none()
    }
}

/// Resolve the binding of a single resource item.
///
/// An item without an alias still gets acquired and released; it simply
/// binds nothing.
pub fn resolve(item: &ResourceItem) -> Result<ResolvedBinding, LowerError> {
    let Some(pattern) = &item.binding else {
        return Ok(ResolvedBinding {
            pattern: None,
            names: Vec::new(),
        });
    };

    match (item.entry_arity, pattern) {
        (Some(0), _) => {
            return Err(LowerError::malformed(format!(
                "entry handler yields no value but is bound to `{}`",
                pattern
            )));
        }
        (Some(arity), BindingPattern::Tuple(slots)) if slots.len() != arity => {
            return Err(LowerError::malformed(format!(
                "`{}` has {} slots but the entry handler yields {} values",
                pattern,
                slots.len(),
                arity
            )));
        }
        _ => {}
    }

    let mut names = Vec::new();
    collect_names(pattern, &mut names)?;

    let mut seen = HashSet::new();
    if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(LowerError::malformed(format!(
            "`{}` binds `{}` more than once",
            pattern, dup
        )));
    }

    Ok(ResolvedBinding {
        pattern: Some(pattern.clone()),
        names,
    })
}

fn collect_names(pattern: &BindingPattern, names: &mut Vec<String>) -> Result<(), LowerError> {
    match pattern {
        BindingPattern::Name(name) => {
            if !is_identifier(name) {
                return Err(LowerError::malformed(format!(
                    "`{}` is not a valid binding name",
                    name
                )));
            }
            names.push(name.clone());
        }
        BindingPattern::Tuple(slots) => {
            if slots.is_empty() {
                return Err(LowerError::malformed("empty tuple pattern"));
            }
            for slot in slots {
                collect_names(slot, names)?;
            }
        }
    }
    Ok(())
}

/// Bind `pattern` from `source` using explicit indexing, for targets that
/// cannot destructure natively.
///
/// `(a, (b, c))` from `v` with base 1 gives `a = v[1]`, `b = v[2][1]`,
/// `c = v[2][2]`.
pub fn indexed_bindings(pattern: &BindingPattern, source: &Expr, index_base: usize) -> Vec<Stmt> {
    let mut out = Vec::new();
    push_indexed(pattern, source.clone(), index_base, &mut out);
    out
}

fn push_indexed(pattern: &BindingPattern, source: Expr, index_base: usize, out: &mut Vec<Stmt>) {
    match pattern {
        BindingPattern::Name(name) => out.push(Stmt::let_decl(name.clone(), Some(source))),
        BindingPattern::Tuple(slots) => {
            for (i, slot) in slots.iter().enumerate() {
                let element = Expr::index(source.clone(), Expr::number((i + index_base) as f64));
                push_indexed(slot, element, index_base, out);
            }
        }
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl fmt::Display for BindingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingPattern::Name(name) => f.write_str(name),
            BindingPattern::Tuple(slots) => {
                f.write_str("(")?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", slot)?;
                }
                if slots.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ResourceItem {
        ResourceItem::new(Expr::call(Expr::ident("open"), vec![]))
    }

    #[test]
    fn test_no_alias_discards_value() {
        let resolved = resolve(&item()).unwrap();
        assert!(resolved.is_discarded());
        assert!(resolved.names.is_empty());
    }

    #[test]
    fn test_single_alias() {
        let resolved = resolve(&item().bind(BindingPattern::name("f"))).unwrap();
        assert_eq!(resolved.names, vec!["f"]);
        assert_eq!(resolved.pattern, Some(BindingPattern::name("f")));
    }

    #[test]
    fn test_tuple_preserves_slot_order() {
        let resolved = resolve(&item().bind(BindingPattern::names(["b", "c"]))).unwrap();
        assert_eq!(resolved.names, vec!["b", "c"]);
    }

    #[test]
    fn test_nested_tuple() {
        let pattern = BindingPattern::tuple(vec![
            BindingPattern::name("a"),
            BindingPattern::names(["b", "c"]),
        ]);
        let resolved = resolve(&item().bind(pattern)).unwrap();
        assert_eq!(resolved.names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_tuple_is_malformed() {
        let err = resolve(&item().bind(BindingPattern::tuple(vec![]))).unwrap_err();
        assert!(matches!(err, LowerError::MalformedBinding { .. }));

        let nested = BindingPattern::tuple(vec![
            BindingPattern::name("a"),
            BindingPattern::tuple(vec![]),
        ]);
        assert!(resolve(&item().bind(nested)).is_err());
    }

    #[test]
    fn test_invalid_name_is_malformed() {
        assert!(resolve(&item().bind(BindingPattern::name(""))).is_err());
        assert!(resolve(&item().bind(BindingPattern::name("1x"))).is_err());
        assert!(resolve(&item().bind(BindingPattern::name("a-b"))).is_err());
    }

    #[test]
    fn test_duplicate_name_is_malformed() {
        let err = resolve(&item().bind(BindingPattern::names(["a", "a"]))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed binding: `(a, a)` binds `a` more than once"
        );
    }

    #[test]
    fn test_zero_valued_entry_cannot_be_bound() {
        let bound = item().with_entry_arity(0).bind(BindingPattern::name("x"));
        assert!(matches!(
            resolve(&bound),
            Err(LowerError::MalformedBinding { .. })
        ));

        // Discarding a zero-valued entry is fine.
        assert!(resolve(&item().with_entry_arity(0)).is_ok());
    }

    #[test]
    fn test_known_arity_must_match_tuple() {
        let mismatch = item()
            .with_entry_arity(3)
            .bind(BindingPattern::names(["a", "b"]));
        assert!(resolve(&mismatch).is_err());

        let matching = item()
            .with_entry_arity(2)
            .bind(BindingPattern::names(["a", "b"]));
        assert_eq!(resolve(&matching).unwrap().names, vec!["a", "b"]);
    }

    #[test]
    fn test_indexed_bindings_nested() {
        let pattern = BindingPattern::tuple(vec![
            BindingPattern::name("a"),
            BindingPattern::names(["b", "c"]),
        ]);
        let stmts = indexed_bindings(&pattern, &Expr::ident("v"), 1);
        let v = || Expr::ident("v");
        assert_eq!(
            stmts,
            vec![
                Stmt::let_decl("a", Some(Expr::index(v(), Expr::number(1)))),
                Stmt::let_decl(
                    "b",
                    Some(Expr::index(Expr::index(v(), Expr::number(2)), Expr::number(1)))
                ),
                Stmt::let_decl(
                    "c",
                    Some(Expr::index(Expr::index(v(), Expr::number(2)), Expr::number(2)))
                ),
            ]
        );
    }

    #[test]
    fn test_display_single_slot_tuple() {
        assert_eq!(BindingPattern::names(["a"]).to_string(), "(a,)");
    }
}
