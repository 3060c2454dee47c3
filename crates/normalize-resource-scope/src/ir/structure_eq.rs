//! Structural equality for IR types.
//!
//! Lowered trees are compared ignoring surface hints: whether a declaration
//! is `const` or `let` (Lua has one kind of local) and whether a member
//! access with a string property was written with brackets. Everything else
//! must match, including item order and suspension points.

use super::{Expr, Function, Program, ResourceItem, ScopedStatement, Stmt};

/// Equality modulo surface hints.
pub trait StructureEq {
    fn structure_eq(&self, other: &Self) -> bool;
}

impl<T: StructureEq> StructureEq for [T] {
    fn structure_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.structure_eq(b))
    }
}

impl<T: StructureEq> StructureEq for Vec<T> {
    fn structure_eq(&self, other: &Self) -> bool {
        self.as_slice().structure_eq(other.as_slice())
    }
}

impl<T: StructureEq + ?Sized> StructureEq for Box<T> {
    fn structure_eq(&self, other: &Self) -> bool {
        (**self).structure_eq(&**other)
    }
}

impl<T: StructureEq> StructureEq for Option<T> {
    fn structure_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.structure_eq(b),
            _ => false,
        }
    }
}

impl StructureEq for Program {
    fn structure_eq(&self, other: &Self) -> bool {
        self.body.structure_eq(&other.body)
    }
}

impl StructureEq for Stmt {
    fn structure_eq(&self, other: &Self) -> bool {
        use Stmt::*;
        match (self, other) {
            (Expr(a), Expr(b)) | (Throw(a), Throw(b)) => a.structure_eq(b),
            (Let { name: n1, init: i1, .. }, Let { name: n2, init: i2, .. }) => {
                n1 == n2 && i1.structure_eq(i2)
            }
            (
                Destructure { pattern: p1, init: i1 },
                Destructure { pattern: p2, init: i2 },
            ) => p1 == p2 && i1.structure_eq(i2),
            (Block(a), Block(b)) => a.structure_eq(b),
            (
                If { test: t1, consequent: c1, alternate: a1 },
                If { test: t2, consequent: c2, alternate: a2 },
            ) => t1.structure_eq(t2) && c1.structure_eq(c2) && a1.structure_eq(a2),
            (While { test: t1, body: b1 }, While { test: t2, body: b2 }) => {
                t1.structure_eq(t2) && b1.structure_eq(b2)
            }
            (
                For { init: i1, test: t1, update: u1, body: b1 },
                For { init: i2, test: t2, update: u2, body: b2 },
            ) => {
                i1.structure_eq(i2)
                    && t1.structure_eq(t2)
                    && u1.structure_eq(u2)
                    && b1.structure_eq(b2)
            }
            (
                ForIn { variable: v1, iterable: i1, body: b1 },
                ForIn { variable: v2, iterable: i2, body: b2 },
            ) => v1 == v2 && i1.structure_eq(i2) && b1.structure_eq(b2),
            (Return(a), Return(b)) => a.structure_eq(b),
            (Break, Break) | (Continue, Continue) => true,
            (
                TryCatch { body: b1, catch_param: p1, catch_body: c1, finally_body: f1 },
                TryCatch { body: b2, catch_param: p2, catch_body: c2, finally_body: f2 },
            ) => p1 == p2 && b1.structure_eq(b2) && c1.structure_eq(c2) && f1.structure_eq(f2),
            (Function(a), Function(b)) => a.structure_eq(b),
            (With(a), With(b)) => a.structure_eq(b),
            _ => false,
        }
    }
}

impl StructureEq for ScopedStatement {
    fn structure_eq(&self, other: &Self) -> bool {
        self.is_async == other.is_async
            && self.items.structure_eq(&other.items)
            && self.body.structure_eq(&other.body)
    }
}

impl StructureEq for ResourceItem {
    fn structure_eq(&self, other: &Self) -> bool {
        self.binding == other.binding
            && self.entry_arity == other.entry_arity
            && self.acquire.structure_eq(&other.acquire)
    }
}

impl StructureEq for Expr {
    fn structure_eq(&self, other: &Self) -> bool {
        use Expr::*;
        match (self, other) {
            (Literal(a), Literal(b)) => a == b,
            (Ident(a), Ident(b)) => a == b,
            (
                Binary { left: l1, op: o1, right: r1 },
                Binary { left: l2, op: o2, right: r2 },
            ) => o1 == o2 && l1.structure_eq(l2) && r1.structure_eq(r2),
            (Unary { op: o1, expr: e1 }, Unary { op: o2, expr: e2 }) => {
                o1 == o2 && e1.structure_eq(e2)
            }
            (Call { callee: c1, args: a1 }, Call { callee: c2, args: a2 }) => {
                c1.structure_eq(c2) && a1.structure_eq(a2)
            }
            (
                MethodCall { receiver: r1, method: m1, args: a1 },
                MethodCall { receiver: r2, method: m2, args: a2 },
            ) => m1 == m2 && r1.structure_eq(r2) && a1.structure_eq(a2),
            (
                Member { object: o1, property: p1, computed: c1 },
                Member { object: o2, property: p2, computed: c2 },
            ) => {
                let hint = |p: &Expr, c: bool| c && !matches!(p, Literal(super::Literal::String(_)));
                o1.structure_eq(o2) && p1.structure_eq(p2) && hint(p1, *c1) == hint(p2, *c2)
            }
            (Array(a), Array(b)) => a.structure_eq(b),
            (Object(a), Object(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((k1, v1), (k2, v2))| k1 == k2 && v1.structure_eq(v2))
            }
            (Function(a), Function(b)) => a.structure_eq(b),
            (
                Conditional { test: t1, consequent: c1, alternate: a1 },
                Conditional { test: t2, consequent: c2, alternate: a2 },
            ) => t1.structure_eq(t2) && c1.structure_eq(c2) && a1.structure_eq(a2),
            (Assign { target: t1, value: v1 }, Assign { target: t2, value: v2 }) => {
                t1.structure_eq(t2) && v1.structure_eq(v2)
            }
            (Await(a), Await(b)) => a.structure_eq(b),
            _ => false,
        }
    }
}

impl StructureEq for Function {
    fn structure_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_async == other.is_async
            && self.params == other.params
            && self.body.structure_eq(&other.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_kind_is_a_hint() {
        let program = |decl| Program::new(vec![decl]);
        let fixed = program(Stmt::const_decl("x", Expr::number(1)));
        let rebound = program(Stmt::let_decl("x", Some(Expr::number(1))));

        assert!(fixed.structure_eq(&rebound));
        assert_ne!(fixed, rebound);
    }

    #[test]
    fn test_bracketed_string_member_is_a_hint() {
        let member = |computed| Expr::Member {
            object: Box::new(Expr::ident("table")),
            property: Box::new(Expr::string("unpack")),
            computed,
        };
        assert!(member(false).structure_eq(&member(true)));

        let slot = |computed| Expr::Member {
            object: Box::new(Expr::ident("t")),
            property: Box::new(Expr::ident("k")),
            computed,
        };
        assert!(!slot(false).structure_eq(&slot(true)));
    }

    #[test]
    fn test_item_order_matters() {
        let a = ResourceItem::new(Expr::call(Expr::ident("a"), vec![]));
        let b = ResourceItem::new(Expr::call(Expr::ident("b"), vec![]));
        let ab = ScopedStatement::new(vec![a.clone(), b.clone()], vec![]);
        let ba = ScopedStatement::new(vec![b, a], vec![]);

        assert!(!ab.structure_eq(&ba));
        assert!(ab.structure_eq(&ab.clone()));
    }

    #[test]
    fn test_hints_ignored_inside_scoped_body() {
        let item = ResourceItem::new(Expr::ident("lock"));
        let with_const = Stmt::with(ScopedStatement::new(
            vec![item.clone()],
            vec![Stmt::const_decl("x", Expr::number(1))],
        ));
        let with_let = Stmt::with(ScopedStatement::new(
            vec![item],
            vec![Stmt::let_decl("x", Some(Expr::number(1)))],
        ));

        assert!(with_const.structure_eq(&with_let));
    }

    #[test]
    fn test_suspension_is_not_a_hint() {
        let call = Expr::method_call(Expr::ident("mgr"), "enter", vec![]);
        assert!(!call.structure_eq(&Expr::awaited(call.clone())));
    }
}
