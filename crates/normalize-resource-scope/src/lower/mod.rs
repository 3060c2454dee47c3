//! Lowering of scoped-resource statements.
//!
//! Rewrites every `Stmt::With` in a tree into constructs the target can print:
//! targets with a native construct keep it, others get one guarded region per
//! item, nested in acquisition order so that releases run innermost first.
//!
//! Each expanded item follows the same shape:
//!
//! 1. evaluate the manager and call its entry handler, unguarded, so a failed
//!    acquisition never releases the item itself;
//! 2. inside the guarded region, bind the entry value and run the rest of the
//!    statement (later items, then the body);
//! 3. on error, call the exit handler with the error and rethrow unless it
//!    returned a truthy value;
//! 4. on any other exit, call the exit handler with null.
//!
//! Generated temporaries are `<temp_prefix><role><n>`, numbered per call in
//! source order, so lowering the same input twice gives identical output.

mod protected_call;
mod suspension;
mod try_catch;

use crate::binding::{self, ResolvedBinding, indexed_bindings};
use crate::config::LoweringConfig;
use crate::error::LowerError;
use crate::ir::*;
use crate::plan::plan;
use crate::target::{ExpansionStyle, TargetConventions};
use crate::traits::Writer;
use rayon::prelude::*;

/// Lower every scoped statement in a program.
///
/// The top level counts as an async body only when
/// [`LoweringConfig::allow_top_level_await`] is set.
pub fn lower_program(
    program: &Program,
    conventions: &TargetConventions,
    config: &LoweringConfig,
) -> Result<Program, LowerError> {
    let mut lowerer = Lowerer::new(conventions, config);
    let body = lowerer.lower_body(&program.body, config.allow_top_level_await)?;
    Ok(Program::new(body))
}

/// Lower a single scoped statement into a statement sequence.
///
/// The statement is a fragment spliced into a body this call cannot see, so
/// an async statement is taken to sit in an async body. Nested async
/// statements still need an async function or the statement itself around
/// them.
pub fn lower_scoped_statement(
    stmt: &ScopedStatement,
    conventions: &TargetConventions,
    config: &LoweringConfig,
) -> Result<Vec<Stmt>, LowerError> {
    let mut lowerer = Lowerer::new(conventions, config);
    lowerer.lower_scoped(stmt, stmt.is_async || config.allow_top_level_await)
}

/// Lower a scoped statement for `writer`'s target and print it.
pub fn transpile_scoped_statement(
    stmt: &ScopedStatement,
    writer: &dyn Writer,
    config: &LoweringConfig,
) -> Result<String, LowerError> {
    let body = lower_scoped_statement(stmt, writer.conventions(), config)?;
    Ok(render(&Program::new(body), writer, config))
}

/// Lower a whole program for `writer`'s target and print it.
pub fn transpile_program(
    program: &Program,
    writer: &dyn Writer,
    config: &LoweringConfig,
) -> Result<String, LowerError> {
    let lowered = lower_program(program, writer.conventions(), config)?;
    Ok(render(&lowered, writer, config))
}

/// Transpile independent statements in parallel.
///
/// Results are in input order. A failing statement does not affect the others.
pub fn transpile_batch(
    stmts: &[ScopedStatement],
    writer: &dyn Writer,
    config: &LoweringConfig,
) -> Vec<Result<String, LowerError>> {
    stmts
        .par_iter()
        .enumerate()
        .map(|(index, stmt)| {
            let result = transpile_scoped_statement(stmt, writer, config);
            if let Err(err) = &result {
                tracing::warn!(index, language = writer.language(), "skipping statement: {}", err);
            }
            result
        })
        .collect()
}

fn render(program: &Program, writer: &dyn Writer, config: &LoweringConfig) -> String {
    let width = config.indent_width.unwrap_or_else(|| writer.indent_width());
    writer.write_indented(program, width)
}

/// A resource item with its binding resolved, its acquisition lowered and
/// its temporaries numbered.
struct PreparedItem<'a> {
    item: &'a ResourceItem,
    acquire: Expr,
    binding: ResolvedBinding,
    temp: usize,
}

struct Lowerer<'a> {
    conventions: &'a TargetConventions,
    config: &'a LoweringConfig,
    next_temp: usize,
}

impl<'a> Lowerer<'a> {
    fn new(conventions: &'a TargetConventions, config: &'a LoweringConfig) -> Self {
        Self {
            conventions,
            config,
            next_temp: 0,
        }
    }

    fn temp(&self, role: &str, n: usize) -> String {
        format!("{}{}{}", self.config.temp_prefix, role, n)
    }

    fn lower_body(&mut self, stmts: &[Stmt], in_async: bool) -> Result<Vec<Stmt>, LowerError> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match stmt {
                Stmt::With(scoped) => out.extend(self.lower_scoped(scoped, in_async)?),
                _ => out.push(self.lower_stmt(stmt, in_async)?),
            }
        }
        Ok(out)
    }

    /// Lower a statement in a single-statement position.
    fn lower_stmt(&mut self, stmt: &Stmt, in_async: bool) -> Result<Stmt, LowerError> {
        let lowered = match stmt {
            Stmt::Expr(expr) => Stmt::Expr(self.lower_expr(expr, in_async)?),
            Stmt::Let {
                name,
                init,
                mutable,
            } => Stmt::Let {
                name: name.clone(),
                init: self.lower_opt_expr(init.as_ref(), in_async)?,
                mutable: *mutable,
            },
            Stmt::Destructure { pattern, init } => Stmt::Destructure {
                pattern: pattern.clone(),
                init: self.lower_expr(init, in_async)?,
            },
            Stmt::Block(stmts) => Stmt::Block(self.lower_body(stmts, in_async)?),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => Stmt::If {
                test: self.lower_expr(test, in_async)?,
                consequent: Box::new(self.lower_stmt(consequent, in_async)?),
                alternate: self.lower_opt_stmt(alternate.as_deref(), in_async)?,
            },
            Stmt::While { test, body } => Stmt::While {
                test: self.lower_expr(test, in_async)?,
                body: Box::new(self.lower_stmt(body, in_async)?),
            },
            Stmt::For {
                init,
                test,
                update,
                body,
            } => Stmt::For {
                init: self.lower_opt_stmt(init.as_deref(), in_async)?,
                test: self.lower_opt_expr(test.as_ref(), in_async)?,
                update: self.lower_opt_expr(update.as_ref(), in_async)?,
                body: Box::new(self.lower_stmt(body, in_async)?),
            },
            Stmt::ForIn {
                variable,
                iterable,
                body,
            } => Stmt::ForIn {
                variable: variable.clone(),
                iterable: self.lower_expr(iterable, in_async)?,
                body: Box::new(self.lower_stmt(body, in_async)?),
            },
            Stmt::Return(expr) => Stmt::Return(self.lower_opt_expr(expr.as_ref(), in_async)?),
            Stmt::Break => Stmt::Break,
            Stmt::Continue => Stmt::Continue,
            Stmt::Throw(expr) => Stmt::Throw(self.lower_expr(expr, in_async)?),
            Stmt::TryCatch {
                body,
                catch_param,
                catch_body,
                finally_body,
            } => Stmt::TryCatch {
                body: Box::new(self.lower_stmt(body, in_async)?),
                catch_param: catch_param.clone(),
                catch_body: self.lower_opt_stmt(catch_body.as_deref(), in_async)?,
                finally_body: self.lower_opt_stmt(finally_body.as_deref(), in_async)?,
            },
            Stmt::Function(f) => Stmt::Function(self.lower_function(f)?),
            Stmt::With(scoped) => {
                let mut stmts = self.lower_scoped(scoped, in_async)?;
                if stmts.len() == 1 {
                    stmts.remove(0)
                } else {
                    Stmt::Block(stmts)
                }
            }
        };
        Ok(lowered)
    }

    fn lower_opt_stmt(
        &mut self,
        stmt: Option<&Stmt>,
        in_async: bool,
    ) -> Result<Option<Box<Stmt>>, LowerError> {
        stmt.map(|s| self.lower_stmt(s, in_async).map(Box::new))
            .transpose()
    }

    fn lower_function(&mut self, f: &Function) -> Result<Function, LowerError> {
        Ok(Function {
            name: f.name.clone(),
            params: f.params.clone(),
            body: self.lower_body(&f.body, f.is_async)?,
            is_async: f.is_async,
        })
    }

    /// Expressions only matter for the function literals they may contain.
    fn lower_expr(&mut self, expr: &Expr, in_async: bool) -> Result<Expr, LowerError> {
        let lowered = match expr {
            Expr::Literal(_) | Expr::Ident(_) => expr.clone(),
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(self.lower_expr(left, in_async)?),
                op: *op,
                right: Box::new(self.lower_expr(right, in_async)?),
            },
            Expr::Unary { op, expr } => Expr::Unary {
                op: *op,
                expr: Box::new(self.lower_expr(expr, in_async)?),
            },
            Expr::Call { callee, args } => Expr::Call {
                callee: Box::new(self.lower_expr(callee, in_async)?),
                args: self.lower_exprs(args, in_async)?,
            },
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => Expr::MethodCall {
                receiver: Box::new(self.lower_expr(receiver, in_async)?),
                method: method.clone(),
                args: self.lower_exprs(args, in_async)?,
            },
            Expr::Member {
                object,
                property,
                computed,
            } => Expr::Member {
                object: Box::new(self.lower_expr(object, in_async)?),
                property: Box::new(self.lower_expr(property, in_async)?),
                computed: *computed,
            },
            Expr::Array(items) => Expr::Array(self.lower_exprs(items, in_async)?),
            Expr::Object(pairs) => Expr::Object(
                pairs
                    .iter()
                    .map(|(key, value)| -> Result<(String, Expr), LowerError> {
                        Ok((key.clone(), self.lower_expr(value, in_async)?))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Function(f) => Expr::Function(Box::new(self.lower_function(f)?)),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => Expr::Conditional {
                test: Box::new(self.lower_expr(test, in_async)?),
                consequent: Box::new(self.lower_expr(consequent, in_async)?),
                alternate: Box::new(self.lower_expr(alternate, in_async)?),
            },
            Expr::Assign { target, value } => Expr::Assign {
                target: Box::new(self.lower_expr(target, in_async)?),
                value: Box::new(self.lower_expr(value, in_async)?),
            },
            Expr::Await(inner) => Expr::Await(Box::new(self.lower_expr(inner, in_async)?)),
        };
        Ok(lowered)
    }

    fn lower_exprs(&mut self, exprs: &[Expr], in_async: bool) -> Result<Vec<Expr>, LowerError> {
        exprs.iter().map(|e| self.lower_expr(e, in_async)).collect()
    }

    fn lower_opt_expr(
        &mut self,
        expr: Option<&Expr>,
        in_async: bool,
    ) -> Result<Option<Expr>, LowerError> {
        expr.map(|e| self.lower_expr(e, in_async)).transpose()
    }

    fn lower_scoped(
        &mut self,
        scoped: &ScopedStatement,
        in_async: bool,
    ) -> Result<Vec<Stmt>, LowerError> {
        let plan = plan(&scoped.items)?;
        suspension::check_context(self.conventions, scoped, in_async)?;

        tracing::debug!(
            language = self.conventions.language,
            items = plan.len(),
            is_async = scoped.is_async,
            "lowering scoped statement"
        );

        // Number this statement's temporaries before any nested statement
        let base = self.next_temp;
        self.next_temp += plan.len();

        let mut prepared = Vec::with_capacity(plan.len());
        for &index in plan.acquire_order() {
            let item = &scoped.items[index];
            let binding = binding::resolve(item)?;
            if self.conventions.expansion != ExpansionStyle::Native {
                self.check_reserved(&binding)?;
            }
            let acquire = self.lower_expr(&item.acquire, in_async)?;
            prepared.push(PreparedItem {
                item,
                acquire,
                binding,
                temp: base + index,
            });
        }

        let body = self.lower_body(&scoped.body, in_async)?;

        if self.conventions.expansion == ExpansionStyle::Native {
            let items = prepared
                .into_iter()
                .map(|p| ResourceItem {
                    acquire: p.acquire,
                    ..p.item.clone()
                })
                .collect();
            return Ok(vec![Stmt::With(ScopedStatement {
                items,
                body,
                is_async: scoped.is_async,
            })]);
        }

        // Wrap from the inside out: the first item released is the innermost.
        let mut inner = body;
        for &index in plan.release_order() {
            let item = &prepared[index];
            tracing::trace!(
                index,
                temp = item.temp,
                names = ?item.binding.names,
                "expanding resource item"
            );
            inner = if self.conventions.expansion == ExpansionStyle::ProtectedCall {
                self.expand_protected_call(item, inner)?
            } else {
                self.expand_try_catch(item, scoped.is_async, inner)
            };
        }
        Ok(inner)
    }

    /// User names must not shadow generated temporaries.
    fn check_reserved(&self, binding: &ResolvedBinding) -> Result<(), LowerError> {
        let prefix = &self.config.temp_prefix;
        match binding.names.iter().find(|name| name.starts_with(prefix.as_str())) {
            Some(name) => Err(LowerError::malformed(format!(
                "`{}` collides with generated names (prefix `{}`)",
                name, prefix
            ))),
            None => Ok(()),
        }
    }

    /// Statements binding the entry value held in `value` to the item's pattern.
    fn bind_entry_value(&self, binding: &ResolvedBinding, value: &str) -> Vec<Stmt> {
        match &binding.pattern {
            None => Vec::new(),
            Some(BindingPattern::Name(name)) => {
                vec![Stmt::let_decl(name.clone(), Some(Expr::ident(value)))]
            }
            Some(pattern) if self.conventions.native_unpacking => {
                vec![Stmt::destructure(pattern.clone(), Expr::ident(value))]
            }
            Some(pattern) => {
                indexed_bindings(pattern, &Expr::ident(value), self.conventions.index_base)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{LUA_CONVENTIONS, PYTHON_CONVENTIONS, TYPESCRIPT_CONVENTIONS};

    fn call(name: &str) -> Expr {
        Expr::call(Expr::ident(name), vec![])
    }

    fn config() -> LoweringConfig {
        LoweringConfig::default()
    }

    fn count_try(stmts: &[Stmt]) -> usize {
        stmts
            .iter()
            .map(|s| match s {
                Stmt::TryCatch { body, .. } => {
                    1 + match body.as_ref() {
                        Stmt::Block(inner) => count_try(inner),
                        _ => 0,
                    }
                }
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_nesting_depth_follows_item_count() {
        for n in 1..=6 {
            let items = (0..n).map(|i| ResourceItem::new(call(&format!("r{}", i)))).collect();
            let stmt = ScopedStatement::new(items, vec![]);
            let lowered = lower_scoped_statement(&stmt, &TYPESCRIPT_CONVENTIONS, &config()).unwrap();
            assert_eq!(count_try(&lowered), n);
        }
    }

    #[test]
    fn test_native_target_keeps_statement() {
        let stmt = ScopedStatement::new(
            vec![ResourceItem::new(call("open")).bind(BindingPattern::name("f"))],
            vec![Stmt::expr(call("work"))],
        );
        let lowered = lower_scoped_statement(&stmt, &PYTHON_CONVENTIONS, &config()).unwrap();
        assert_eq!(lowered, vec![Stmt::With(stmt)]);
    }

    #[test]
    fn test_empty_statement_rejected() {
        let stmt = ScopedStatement::new(vec![], vec![]);
        for conventions in [&PYTHON_CONVENTIONS, &TYPESCRIPT_CONVENTIONS, &LUA_CONVENTIONS] {
            assert_eq!(
                lower_scoped_statement(&stmt, conventions, &config()),
                Err(LowerError::EmptyStatement)
            );
        }
    }

    #[test]
    fn test_malformed_binding_aborts() {
        let stmt = ScopedStatement::new(
            vec![
                ResourceItem::new(call("ok")),
                ResourceItem::new(call("bad")).bind(BindingPattern::tuple(vec![])),
            ],
            vec![],
        );
        let err = lower_scoped_statement(&stmt, &TYPESCRIPT_CONVENTIONS, &config()).unwrap_err();
        assert!(matches!(err, LowerError::MalformedBinding { .. }));
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        let stmt = ScopedStatement::new(
            vec![ResourceItem::new(call("open")).bind(BindingPattern::name("__mgr0"))],
            vec![],
        );
        let err = lower_scoped_statement(&stmt, &TYPESCRIPT_CONVENTIONS, &config()).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn test_reserved_prefix_allowed_for_native_target() {
        let stmt = ScopedStatement::new(
            vec![ResourceItem::new(call("open")).bind(BindingPattern::name("__f"))],
            vec![],
        );
        let lowered = lower_scoped_statement(&stmt, &PYTHON_CONVENTIONS, &config()).unwrap();
        assert_eq!(lowered, vec![Stmt::With(stmt)]);
    }

    #[test]
    fn test_acquisition_is_lowered() {
        let make = |body| {
            let callback = Function::anonymous(vec![], body);
            Expr::call(Expr::ident("make"), vec![Expr::Function(Box::new(callback))])
        };
        let nested = ScopedStatement::new(vec![ResourceItem::new(call("lock"))], vec![]);
        let stmt = ScopedStatement::new(
            vec![ResourceItem::new(make(vec![Stmt::with(nested.clone())]))],
            vec![],
        );

        for conventions in [&TYPESCRIPT_CONVENTIONS, &LUA_CONVENTIONS] {
            let lowered = lower_scoped_statement(&stmt, conventions, &config()).unwrap();
            let defaults = config();
            let mut inner = Lowerer::new(conventions, &defaults);
            inner.next_temp = 1;
            let expected = make(inner.lower_scoped(&nested, false).unwrap());
            assert!(
                lowered[0].structure_eq(&Stmt::const_decl("__mgr0", expected)),
                "{}",
                conventions.language
            );
        }

        let native = lower_scoped_statement(&stmt, &PYTHON_CONVENTIONS, &config()).unwrap();
        let [Stmt::With(native)] = native.as_slice() else {
            panic!("expected native statement");
        };
        assert_eq!(native.items[0].acquire, make(vec![Stmt::with(nested)]));
    }

    #[test]
    fn test_nested_statement_in_function_is_lowered() {
        let program = Program::new(vec![Stmt::function(Function::new(
            "run",
            vec![],
            vec![Stmt::with(ScopedStatement::new(
                vec![ResourceItem::new(call("open"))],
                vec![Stmt::return_stmt(None)],
            ))],
        ))]);
        let lowered = lower_program(&program, &TYPESCRIPT_CONVENTIONS, &config()).unwrap();
        let Stmt::Function(f) = &lowered.body[0] else {
            panic!("expected function");
        };
        assert!(!f.body.iter().any(|s| matches!(s, Stmt::With(_))));
        assert_eq!(count_try(&f.body), 1);
    }

    #[test]
    fn test_outer_statement_numbered_first() {
        let inner = ScopedStatement::new(vec![ResourceItem::new(call("inner"))], vec![]);
        let outer = ScopedStatement::new(
            vec![ResourceItem::new(call("outer"))],
            vec![Stmt::with(inner)],
        );
        let lowered = lower_scoped_statement(&outer, &TYPESCRIPT_CONVENTIONS, &config()).unwrap();
        assert_eq!(lowered[0], Stmt::const_decl("__mgr0", call("outer")));
    }

    #[test]
    fn test_custom_temp_prefix() {
        let config = LoweringConfig {
            temp_prefix: "_rs_".into(),
            ..LoweringConfig::default()
        };
        let stmt = ScopedStatement::new(vec![ResourceItem::new(call("open"))], vec![]);
        let lowered = lower_scoped_statement(&stmt, &LUA_CONVENTIONS, &config).unwrap();
        assert_eq!(lowered[0], Stmt::const_decl("_rs_mgr0", call("open")));
    }
}
