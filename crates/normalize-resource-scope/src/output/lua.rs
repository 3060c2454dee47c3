//! Lua writer for surface-syntax IR.
//!
//! Lua has no exceptions, only errors raised with `error` and caught with
//! `pcall`. `Stmt::TryCatch` is printed as protected calls, which cannot carry
//! a `return` out of the guarded body; the resource lowering builds its own
//! protected calls and threads returns through them. Scoped statements must
//! be lowered before printing; one that reaches the writer is printed as a
//! call to `error`.

use crate::ir::*;
use crate::target::{LUA_CONVENTIONS, TargetConventions};
use crate::traits::Writer;
use std::fmt::Write;

/// Static instance of the Lua writer for registry.
pub static LUA_WRITER: LuaWriterImpl = LuaWriterImpl;

/// Lua writer implementing the Writer trait.
pub struct LuaWriterImpl;

impl Writer for LuaWriterImpl {
    fn language(&self) -> &'static str {
        "lua"
    }

    fn extension(&self) -> &'static str {
        "lua"
    }

    fn conventions(&self) -> &'static TargetConventions {
        &LUA_CONVENTIONS
    }

    fn indent_width(&self) -> usize {
        2
    }

    fn write_indented(&self, program: &Program, indent_width: usize) -> String {
        LuaWriter::with_indent_width(indent_width).finish(program)
    }
}

/// Emits IR as Lua source code.
pub struct LuaWriter {
    output: String,
    indent: usize,
    indent_width: usize,
    /// Counter for writer-introduced locals (`__slot0`, `__ok0`, ...).
    locals: usize,
}

impl LuaWriter {
    pub fn new() -> Self {
        Self::with_indent_width(2)
    }

    pub fn with_indent_width(indent_width: usize) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            indent_width,
            locals: 0,
        }
    }

    /// Emit a program to Lua source.
    pub fn emit(program: &Program) -> String {
        Self::new().finish(program)
    }

    fn finish(mut self, program: &Program) -> String {
        self.write_program(program);
        self.output
    }

    fn write_program(&mut self, program: &Program) {
        for stmt in &program.body {
            self.write_stmt(stmt);
            self.output.push('\n');
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent * self.indent_width {
            self.output.push(' ');
        }
    }

    fn fresh_local(&mut self, role: &str) -> String {
        let name = format!("__{}{}", role, self.locals);
        self.locals += 1;
        name
    }

    /// Start a new line at the current indent.
    fn newline(&mut self) {
        self.output.push('\n');
        self.write_indent();
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        self.write_indent();
        self.write_stmt_body(stmt);
    }

    fn write_stmt_body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.write_expr(expr);
            }

            Stmt::Let { name, init, .. } => {
                write!(self.output, "local {}", name).unwrap();
                if let Some(init) = init {
                    self.output.push_str(" = ");
                    self.write_expr(init);
                }
            }

            Stmt::Destructure { pattern, init } => {
                self.write_destructure(pattern, init);
            }

            Stmt::Block(stmts) => {
                self.output.push_str("do\n");
                self.write_stmts(stmts);
                self.write_indent();
                self.output.push_str("end");
            }

            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.output.push_str("if ");
                self.write_expr(test);
                self.output.push_str(" then\n");
                self.write_block_body(consequent);
                let mut alternate = alternate.as_deref();
                while let Some(alt) = alternate {
                    self.write_indent();
                    if let Stmt::If {
                        test,
                        consequent,
                        alternate: next,
                    } = alt
                    {
                        self.output.push_str("elseif ");
                        self.write_expr(test);
                        self.output.push_str(" then\n");
                        self.write_block_body(consequent);
                        alternate = next.as_deref();
                    } else {
                        self.output.push_str("else\n");
                        self.write_block_body(alt);
                        alternate = None;
                    }
                }
                self.write_indent();
                self.output.push_str("end");
            }

            Stmt::While { test, body } => {
                self.output.push_str("while ");
                self.write_expr(test);
                self.output.push_str(" do\n");
                self.write_loop_body(body, None);
                self.write_indent();
                self.output.push_str("end");
            }

            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                // No C-style for in Lua: scope the init and loop with while
                self.output.push_str("do\n");
                self.indent += 1;
                if let Some(init) = init {
                    self.write_stmt(init);
                    self.output.push('\n');
                }
                self.write_indent();
                self.output.push_str("while ");
                match test {
                    Some(test) => self.write_expr(test),
                    None => self.output.push_str("true"),
                }
                self.output.push_str(" do\n");
                self.write_loop_body(body, update.as_ref());
                self.write_indent();
                self.output.push_str("end\n");
                self.indent -= 1;
                self.write_indent();
                self.output.push_str("end");
            }

            Stmt::ForIn {
                variable,
                iterable,
                body,
            } => {
                write!(self.output, "for _, {} in ipairs(", variable).unwrap();
                self.write_expr(iterable);
                self.output.push_str(") do\n");
                self.write_loop_body(body, None);
                self.write_indent();
                self.output.push_str("end");
            }

            Stmt::Return(expr) => {
                self.output.push_str("return");
                if let Some(e) = expr {
                    self.output.push(' ');
                    self.write_expr(e);
                }
            }

            Stmt::Break => {
                self.output.push_str("break");
            }

            Stmt::Continue => {
                self.output.push_str("goto continue");
            }

            Stmt::Throw(expr) => {
                // Level 0: raise the value as-is, without position info
                self.output.push_str("error(");
                self.write_expr(expr);
                self.output.push_str(", 0)");
            }

            Stmt::TryCatch {
                body,
                catch_param,
                catch_body,
                finally_body,
            } => {
                self.write_protected(
                    body,
                    catch_param.as_deref(),
                    catch_body.as_deref(),
                    finally_body.as_deref(),
                );
            }

            Stmt::Function(f) => {
                write!(self.output, "local function {}(", f.name).unwrap();
                self.write_function_rest(f);
            }

            Stmt::With(_) => {
                self.output.push_str("error(\"unlowered scoped statement\", 0)");
            }
        }
    }

    fn write_stmts(&mut self, stmts: &[Stmt]) {
        self.indent += 1;
        for s in stmts {
            self.write_stmt(s);
            self.output.push('\n');
        }
        self.indent -= 1;
    }

    fn write_block_body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => self.write_stmts(stmts),
            _ => self.write_stmts(std::slice::from_ref(stmt)),
        }
    }

    /// Loop body with a `::continue::` label when the body uses `continue`.
    fn write_loop_body(&mut self, body: &Stmt, update: Option<&Expr>) {
        let stmts = match body {
            Stmt::Block(stmts) => stmts.as_slice(),
            _ => std::slice::from_ref(body),
        };
        let needs_label = stmts.iter().any(continues_enclosing_loop);

        match (needs_label, update) {
            (false, None) => self.write_stmts(stmts),
            (false, Some(update)) => {
                self.write_stmts(stmts);
                self.indent += 1;
                self.write_indent();
                self.write_expr(update);
                self.output.push('\n');
                self.indent -= 1;
            }
            (true, None) => {
                // A label ending the block may follow local declarations
                self.write_stmts(stmts);
                self.indent += 1;
                self.write_indent();
                self.output.push_str("::continue::\n");
                self.indent -= 1;
            }
            (true, Some(update)) => {
                // The body's locals must be out of scope at the label
                self.indent += 1;
                self.write_indent();
                self.output.push_str("do\n");
                self.write_stmts(stmts);
                self.write_indent();
                self.output.push_str("end\n");
                self.write_indent();
                self.output.push_str("::continue::\n");
                self.write_indent();
                self.write_expr(update);
                self.output.push('\n');
                self.indent -= 1;
            }
        }
    }

    fn write_protected(
        &mut self,
        body: &Stmt,
        catch_param: Option<&str>,
        catch_body: Option<&Stmt>,
        finally_body: Option<&Stmt>,
    ) {
        let ok = self.fresh_local("ok");
        let err = self.fresh_local("err");

        write!(self.output, "local {}, {} = pcall(function()\n", ok, err).unwrap();
        self.write_block_body(body);
        self.write_indent();
        self.output.push_str("end)");

        if let Some(catch_body) = catch_body {
            self.newline();
            write!(self.output, "if not {} then", ok).unwrap();
            self.indent += 1;
            self.newline();
            write!(
                self.output,
                "{}, {} = pcall(function({})\n",
                ok,
                err,
                catch_param.unwrap_or("_")
            )
            .unwrap();
            self.write_block_body(catch_body);
            self.write_indent();
            write!(self.output, "end, {})", err).unwrap();
            self.indent -= 1;
            self.newline();
            self.output.push_str("end");
        }

        if let Some(finally_body) = finally_body {
            let stmts = match finally_body {
                Stmt::Block(stmts) => stmts.as_slice(),
                _ => std::slice::from_ref(finally_body),
            };
            for s in stmts {
                self.output.push('\n');
                self.write_stmt(s);
            }
        }

        self.newline();
        write!(self.output, "if not {} then", ok).unwrap();
        self.indent += 1;
        self.newline();
        write!(self.output, "error({}, 0)", err).unwrap();
        self.indent -= 1;
        self.newline();
        self.output.push_str("end");
    }

    /// `local a, b = table.unpack(v)`, with nested tuples unpacked from
    /// intermediate locals on the following lines.
    fn write_destructure(&mut self, pattern: &BindingPattern, init: &Expr) {
        let slots = match pattern {
            BindingPattern::Name(name) => {
                write!(self.output, "local {} = ", name).unwrap();
                self.write_expr(init);
                return;
            }
            BindingPattern::Tuple(slots) => slots,
        };

        let mut names = Vec::with_capacity(slots.len());
        let mut nested = Vec::new();
        for slot in slots {
            match slot {
                BindingPattern::Name(name) => names.push(name.clone()),
                BindingPattern::Tuple(_) => {
                    let local = self.fresh_local("slot");
                    names.push(local.clone());
                    nested.push((local, slot));
                }
            }
        }

        write!(self.output, "local {} = table.unpack(", names.join(", ")).unwrap();
        self.write_expr(init);
        self.output.push(')');

        for (local, slot) in nested {
            self.newline();
            self.write_destructure(slot, &Expr::ident(local));
        }
    }

    fn write_function_rest(&mut self, f: &Function) {
        self.output.push_str(&f.params.join(", "));
        self.output.push_str(")\n");
        self.write_stmts(&f.body);
        self.write_indent();
        self.output.push_str("end");
    }

    fn write_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(lit) => self.write_literal(lit),

            Expr::Ident(name) => {
                self.output.push_str(name);
            }

            Expr::Binary { left, op, right } => {
                self.output.push('(');
                self.write_expr(left);
                self.output.push(' ');
                self.write_binary_op(*op);
                self.output.push(' ');
                self.write_expr(right);
                self.output.push(')');
            }

            Expr::Unary { op, expr } => {
                match op {
                    UnaryOp::Neg => self.output.push('-'),
                    UnaryOp::Not => self.output.push_str("not "),
                }
                self.write_expr(expr);
            }

            Expr::Call { callee, args } => {
                self.write_prefix(callee);
                self.write_args(args);
            }

            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                self.write_prefix(receiver);
                write!(self.output, ":{}", method).unwrap();
                self.write_args(args);
            }

            Expr::Member {
                object,
                property,
                computed,
            } => {
                self.write_prefix(object);
                match property.as_ref() {
                    Expr::Literal(Literal::String(s)) if !*computed && is_valid_identifier(s) => {
                        self.output.push('.');
                        self.output.push_str(s);
                    }
                    _ => {
                        self.output.push('[');
                        self.write_expr(property);
                        self.output.push(']');
                    }
                }
            }

            Expr::Array(items) => {
                if items.is_empty() {
                    self.output.push_str("{}");
                    return;
                }
                self.output.push_str("{ ");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_expr(item);
                }
                self.output.push_str(" }");
            }

            Expr::Object(pairs) => {
                if pairs.is_empty() {
                    self.output.push_str("{}");
                    return;
                }
                self.output.push_str("{ ");
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    if is_valid_identifier(key) {
                        self.output.push_str(key);
                    } else {
                        write!(self.output, "[\"{}\"]", escape_string(key)).unwrap();
                    }
                    self.output.push_str(" = ");
                    self.write_expr(value);
                }
                self.output.push_str(" }");
            }

            Expr::Function(f) => {
                self.output.push_str("function(");
                self.write_function_rest(f);
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                // and/or idiom; misbehaves when the consequent is nil or false
                self.output.push('(');
                self.write_expr(test);
                self.output.push_str(" and ");
                self.write_expr(consequent);
                self.output.push_str(" or ");
                self.write_expr(alternate);
                self.output.push(')');
            }

            Expr::Assign { target, value } => {
                self.write_expr(target);
                self.output.push_str(" = ");
                self.write_expr(value);
            }

            Expr::Await(expr) => {
                // Lua has no suspension marker; coroutines yield implicitly
                self.write_expr(expr);
            }
        }
    }

    /// Write an expression in prefix position (before `(`, `:`, `.` or `[`).
    fn write_prefix(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(_) | Expr::Call { .. } | Expr::MethodCall { .. } | Expr::Member { .. } => {
                self.write_expr(expr)
            }
            Expr::Await(inner) => self.write_prefix(inner),
            _ => {
                self.output.push('(');
                self.write_expr(expr);
                self.output.push(')');
            }
        }
    }

    fn write_args(&mut self, args: &[Expr]) {
        self.output.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.write_expr(arg);
        }
        self.output.push(')');
    }

    fn write_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Null => self.output.push_str("nil"),
            Literal::Bool(b) => write!(self.output, "{}", b).unwrap(),
            Literal::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(self.output, "{}", *n as i64).unwrap();
                } else {
                    write!(self.output, "{}", n).unwrap();
                }
            }
            Literal::String(s) => write!(self.output, "\"{}\"", escape_string(s)).unwrap(),
        }
    }

    fn write_binary_op(&mut self, op: BinaryOp) {
        let s = match op {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "~=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Concat => "..",
        };
        self.output.push_str(s);
    }
}

impl Default for LuaWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `stmt` contains a `continue` bound to the loop around it.
fn continues_enclosing_loop(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Continue => true,
        Stmt::Block(stmts) => stmts.iter().any(continues_enclosing_loop),
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            continues_enclosing_loop(consequent)
                || alternate.as_deref().is_some_and(continues_enclosing_loop)
        }
        Stmt::TryCatch {
            body,
            catch_body,
            finally_body,
            ..
        } => {
            continues_enclosing_loop(body)
                || catch_body.as_deref().is_some_and(continues_enclosing_loop)
                || finally_body.as_deref().is_some_and(continues_enclosing_loop)
        }
        _ => false,
    }
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_call() {
        let program = Program::new(vec![
            Stmt::const_decl("x", Expr::number(42)),
            Stmt::expr(Expr::call(Expr::ident("print"), vec![Expr::ident("x")])),
        ]);
        assert_eq!(LuaWriter::emit(&program), "local x = 42\nprint(x)\n");
    }

    #[test]
    fn test_operators() {
        let program = Program::new(vec![Stmt::const_decl(
            "ok",
            Expr::binary(
                Expr::binary(Expr::ident("a"), BinaryOp::Ne, Expr::null()),
                BinaryOp::And,
                Expr::not(Expr::binary(
                    Expr::string("x"),
                    BinaryOp::Concat,
                    Expr::ident("y"),
                )),
            ),
        )]);
        assert_eq!(
            LuaWriter::emit(&program),
            "local ok = ((a ~= nil) and not (\"x\" .. y))\n"
        );
    }

    #[test]
    fn test_method_call_and_index() {
        let program = Program::new(vec![Stmt::expr(Expr::method_call(
            Expr::ident("mgr"),
            "exit",
            vec![Expr::index(
                Expr::index(Expr::ident("outcome"), Expr::number(2)),
                Expr::number(1),
            )],
        ))]);
        assert_eq!(LuaWriter::emit(&program), "mgr:exit(outcome[2][1])\n");
    }

    #[test]
    fn test_elseif_chain() {
        let program = Program::new(vec![Stmt::if_stmt(
            Expr::ident("a"),
            Stmt::return_stmt(Some(Expr::number(1))),
            Some(Stmt::if_stmt(
                Expr::ident("b"),
                Stmt::return_stmt(Some(Expr::number(2))),
                Some(Stmt::return_stmt(None)),
            )),
        )]);
        assert_eq!(
            LuaWriter::emit(&program),
            "if a then\n  return 1\nelseif b then\n  return 2\nelse\n  return\nend\n"
        );
    }

    #[test]
    fn test_protected_call_in_table() {
        let program = Program::new(vec![Stmt::const_decl(
            "outcome",
            Expr::array(vec![Expr::call(
                Expr::ident("pcall"),
                vec![Expr::Function(Box::new(Function::anonymous(
                    vec![],
                    vec![Stmt::throw(Expr::string("boom"))],
                )))],
            )]),
        )]);
        assert_eq!(
            LuaWriter::emit(&program),
            "local outcome = { pcall(function()\n  error(\"boom\", 0)\nend) }\n"
        );
    }

    #[test]
    fn test_nested_destructure() {
        let program = Program::new(vec![Stmt::destructure(
            BindingPattern::tuple(vec![
                BindingPattern::name("a"),
                BindingPattern::names(["b", "c"]),
            ]),
            Expr::ident("value"),
        )]);
        assert_eq!(
            LuaWriter::emit(&program),
            "local a, __slot0 = table.unpack(value)\nlocal b, c = table.unpack(__slot0)\n"
        );
    }

    #[test]
    fn test_continue_gets_label() {
        let program = Program::new(vec![Stmt::for_in(
            "x",
            Expr::ident("xs"),
            Stmt::block(vec![
                Stmt::if_stmt(Expr::ident("x"), Stmt::continue_stmt(), None),
                Stmt::expr(Expr::call(Expr::ident("use"), vec![Expr::ident("x")])),
            ]),
        )]);
        assert_eq!(
            LuaWriter::emit(&program),
            "for _, x in ipairs(xs) do\n  if x then\n    goto continue\n  end\n  use(x)\n  ::continue::\nend\n"
        );
    }

    #[test]
    fn test_c_style_for() {
        let program = Program::new(vec![Stmt::for_loop(
            Some(Stmt::let_decl("i", Some(Expr::number(0)))),
            Some(Expr::binary(Expr::ident("i"), BinaryOp::Lt, Expr::number(3))),
            Some(Expr::assign(
                Expr::ident("i"),
                Expr::binary(Expr::ident("i"), BinaryOp::Add, Expr::number(1)),
            )),
            Stmt::block(vec![Stmt::expr(Expr::call(
                Expr::ident("print"),
                vec![Expr::ident("i")],
            ))]),
        )]);
        assert_eq!(
            LuaWriter::emit(&program),
            "do\n  local i = 0\n  while (i < 3) do\n    print(i)\n    i = (i + 1)\n  end\nend\n"
        );
    }

    #[test]
    fn test_try_catch_finally() {
        let program = Program::new(vec![Stmt::try_catch(
            Stmt::block(vec![Stmt::expr(Expr::call(Expr::ident("work"), vec![]))]),
            Some("e".into()),
            Some(Stmt::block(vec![Stmt::expr(Expr::call(
                Expr::ident("log"),
                vec![Expr::ident("e")],
            ))])),
            Some(Stmt::block(vec![Stmt::expr(Expr::call(
                Expr::ident("cleanup"),
                vec![],
            ))])),
        )]);
        assert_eq!(
            LuaWriter::emit(&program),
            "local __ok0, __err1 = pcall(function()\n  work()\nend)\n\
             if not __ok0 then\n  __ok0, __err1 = pcall(function(e)\n    log(e)\n  end, __err1)\nend\n\
             cleanup()\n\
             if not __ok0 then\n  error(__err1, 0)\nend\n"
        );
    }

    #[test]
    fn test_unlowered_scoped_statement_fails_loudly() {
        let scoped = ScopedStatement::new(
            vec![
                ResourceItem::new(Expr::call(Expr::ident("open"), vec![]))
                    .bind(BindingPattern::name("f")),
                ResourceItem::new(Expr::call(Expr::ident("lock"), vec![])),
            ],
            vec![Stmt::expr(Expr::call(Expr::ident("use"), vec![Expr::ident("f")]))],
        );
        assert_eq!(
            LuaWriter::emit(&Program::new(vec![Stmt::with(scoped)])),
            "error(\"unlowered scoped statement\", 0)\n"
        );
    }

    #[test]
    fn test_indent_width() {
        let program = Program::new(vec![Stmt::while_loop(
            Expr::bool(true),
            Stmt::block(vec![Stmt::break_stmt()]),
        )]);
        assert_eq!(
            LUA_WRITER.write_indented(&program, 4),
            "while true do\n    break\nend\n"
        );
    }
}
