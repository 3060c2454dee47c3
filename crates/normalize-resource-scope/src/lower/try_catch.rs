//! Expansion into `try` / `catch` / `finally`.
//!
//! One item becomes:
//!
//! ```text
//! const __mgr0 = open();
//! const __value0 = __mgr0.enter();
//! let __failed0 = false;
//! try {
//!   let f = __value0;
//!   ...
//! } catch (__error0) {
//!   __failed0 = true;
//!   if (!__mgr0.exit(__error0)) {
//!     throw __error0;
//!   }
//! } finally {
//!   if (!__failed0) {
//!     __mgr0.exit(null);
//!   }
//! }
//! ```
//!
//! `finally` runs on every exit, including `return`, `break` and `continue`,
//! and the flag keeps it from releasing a second time after the catch clause.
//! An exit handler that throws replaces the propagating error.

use super::suspension::suspend;
use super::{Lowerer, PreparedItem};
use crate::ir::{Expr, Stmt};

impl Lowerer<'_> {
    pub(super) fn expand_try_catch(
        &self,
        item: &PreparedItem<'_>,
        is_async: bool,
        inner: Vec<Stmt>,
    ) -> Vec<Stmt> {
        let n = item.temp;
        let manager = self.temp("mgr", n);
        let value = self.temp("value", n);
        let failed = self.temp("failed", n);
        let error = self.temp("error", n);

        let mut out = vec![Stmt::const_decl(manager.clone(), item.acquire.clone())];

        let enter = suspend(
            Expr::method_call(Expr::ident(&manager), self.conventions.enter_method, vec![]),
            is_async,
        );
        if item.binding.is_discarded() {
            out.push(Stmt::expr(enter));
        } else {
            out.push(Stmt::const_decl(value.clone(), enter));
        }
        out.push(Stmt::let_decl(failed.clone(), Some(Expr::bool(false))));

        let mut guarded = self.bind_entry_value(&item.binding, &value);
        guarded.extend(inner);

        let exit_with_error = suspend(
            Expr::method_call(
                Expr::ident(&manager),
                self.conventions.exit_method,
                vec![Expr::ident(&error)],
            ),
            is_async,
        );
        let on_error = Stmt::block(vec![
            Stmt::expr(Expr::assign(Expr::ident(&failed), Expr::bool(true))),
            Stmt::if_stmt(
                Expr::not(exit_with_error),
                Stmt::block(vec![Stmt::throw(Expr::ident(&error))]),
                None,
            ),
        ]);

        let exit_clean = suspend(
            Expr::method_call(
                Expr::ident(&manager),
                self.conventions.exit_method,
                vec![Expr::null()],
            ),
            is_async,
        );
        let on_leave = Stmt::block(vec![Stmt::if_stmt(
            Expr::not(Expr::ident(&failed)),
            Stmt::block(vec![Stmt::expr(exit_clean)]),
            None,
        )]);

        out.push(Stmt::try_catch(
            Stmt::block(guarded),
            Some(error),
            Some(on_error),
            Some(on_leave),
        ));
        out
    }
}
