//! Suspension points of async scoped statements.
//!
//! An async statement lowers exactly like a synchronous one, except that the
//! entry and exit handler calls are awaited.

use crate::error::LowerError;
use crate::ir::{Expr, ScopedStatement};
use crate::target::TargetConventions;

/// Await `call` when the statement is async.
pub(super) fn suspend(call: Expr, is_async: bool) -> Expr {
    if is_async { Expr::awaited(call) } else { call }
}

/// Reject async statements the target or the enclosing body cannot host.
pub(super) fn check_context(
    conventions: &TargetConventions,
    scoped: &ScopedStatement,
    in_async: bool,
) -> Result<(), LowerError> {
    if !scoped.is_async {
        return Ok(());
    }
    if !conventions.supports_suspension {
        return Err(LowerError::unsupported(
            conventions.language,
            "async scoped statements (no suspending entry or exit call)",
        ));
    }
    if !in_async {
        return Err(LowerError::unsupported(
            conventions.language,
            "async scoped statements outside an async body",
        ));
    }
    Ok(())
}
