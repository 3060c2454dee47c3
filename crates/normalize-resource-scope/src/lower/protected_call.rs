//! Expansion into protected calls, for targets whose errors are values
//! caught by `pcall` rather than a `try` statement.
//!
//! One item becomes:
//!
//! ```text
//! local __mgr0 = open()
//! local __value0 = __mgr0:enter()
//! local __outcome0 = { pcall(function()
//!   local f = __value0
//!   ...
//! end) }
//! if __outcome0[1] then
//!   __mgr0:exit(nil)
//! elseif not __mgr0:exit(__outcome0[2]) then
//!   error(__outcome0[2], 0)
//! end
//! ```
//!
//! The guarded region is a closure, so a `return` inside it would only leave
//! the closure. Returns are packed into a table (`return { e }`) and re-issued
//! after the release. `break` and `continue` cannot cross a function boundary
//! and are rejected.

use super::{Lowerer, PreparedItem};
use crate::error::LowerError;
use crate::ir::{BinaryOp, Expr, Function, Stmt};
use crate::outcome::EarlyExitKind;

impl Lowerer<'_> {
    pub(super) fn expand_protected_call(
        &self,
        item: &PreparedItem<'_>,
        inner: Vec<Stmt>,
    ) -> Result<Vec<Stmt>, LowerError> {
        let n = item.temp;
        let manager = self.temp("mgr", n);
        let value = self.temp("value", n);
        let outcome = self.temp("outcome", n);

        let mut out = vec![Stmt::const_decl(manager.clone(), item.acquire.clone())];

        let enter = Expr::method_call(Expr::ident(&manager), self.conventions.enter_method, vec![]);
        if item.binding.is_discarded() {
            out.push(Stmt::expr(enter));
        } else {
            out.push(Stmt::const_decl(value.clone(), enter));
        }

        let mut guarded = self.bind_entry_value(&item.binding, &value);
        guarded.extend(inner);
        let returns = thread_returns(&mut guarded, 0).map_err(|kind| {
            LowerError::unsupported(
                self.conventions.language,
                format!("`{}` out of a scoped statement", keyword(kind)),
            )
        })?;

        let protected = Expr::call(
            Expr::ident("pcall"),
            vec![Expr::Function(Box::new(Function::anonymous(vec![], guarded)))],
        );
        out.push(Stmt::const_decl(outcome.clone(), Expr::array(vec![protected])));

        let succeeded = Expr::index(Expr::ident(&outcome), Expr::number(1));
        let result = Expr::index(Expr::ident(&outcome), Expr::number(2));
        let exit = |arg: Expr| {
            Expr::method_call(Expr::ident(&manager), self.conventions.exit_method, vec![arg])
        };

        let mut on_success = vec![Stmt::expr(exit(Expr::null()))];
        if returns {
            on_success.push(Stmt::if_stmt(
                Expr::binary(result.clone(), BinaryOp::Ne, Expr::null()),
                Stmt::block(vec![Stmt::return_stmt(Some(Expr::call(
                    Expr::member(Expr::ident("table"), "unpack"),
                    vec![result.clone()],
                )))]),
                None,
            ));
        }
        let on_failure = Stmt::if_stmt(
            Expr::not(exit(result.clone())),
            Stmt::block(vec![Stmt::throw(result)]),
            None,
        );

        out.push(Stmt::if_stmt(
            succeeded,
            Stmt::block(on_success),
            Some(on_failure),
        ));
        Ok(out)
    }
}

fn keyword(kind: EarlyExitKind) -> &'static str {
    match kind {
        EarlyExitKind::Return => "return",
        EarlyExitKind::Break => "break",
        EarlyExitKind::Continue => "continue",
    }
}

/// Pack every `return` bound to the enclosing closure into a table.
///
/// Returns whether any was found, or the early exit that cannot leave the
/// closure.
fn thread_returns(stmts: &mut [Stmt], loop_depth: usize) -> Result<bool, EarlyExitKind> {
    let mut found = false;
    for stmt in stmts {
        found |= thread_stmt(stmt, loop_depth)?;
    }
    Ok(found)
}

fn thread_stmt(stmt: &mut Stmt, loop_depth: usize) -> Result<bool, EarlyExitKind> {
    match stmt {
        Stmt::Return(value) => {
            let packed = value.take().into_iter().collect();
            *value = Some(Expr::array(packed));
            Ok(true)
        }
        Stmt::Break if loop_depth == 0 => Err(EarlyExitKind::Break),
        Stmt::Continue if loop_depth == 0 => Err(EarlyExitKind::Continue),
        Stmt::Block(stmts) => thread_returns(stmts, loop_depth),
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            let mut found = thread_stmt(consequent, loop_depth)?;
            if let Some(alt) = alternate {
                found |= thread_stmt(alt, loop_depth)?;
            }
            Ok(found)
        }
        Stmt::While { body, .. } | Stmt::For { body, .. } | Stmt::ForIn { body, .. } => {
            thread_stmt(body, loop_depth + 1)
        }
        Stmt::TryCatch {
            body,
            catch_body,
            finally_body,
            ..
        } => {
            let mut found = thread_stmt(body, loop_depth)?;
            for clause in [catch_body, finally_body].into_iter().flatten() {
                found |= thread_stmt(clause, loop_depth)?;
            }
            Ok(found)
        }
        Stmt::With(scoped) => thread_returns(&mut scoped.body, loop_depth),
        _ => Ok(false),
    }
}
