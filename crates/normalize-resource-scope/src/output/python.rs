//! Python writer for surface-syntax IR.
//!
//! Emits surface-syntax IR as Python source code. Scoped statements are
//! printed natively as `with` / `async with`.

use crate::ir::*;
use crate::target::{PYTHON_CONVENTIONS, TargetConventions};
use crate::traits::Writer;
use std::fmt::Write;

/// Static instance of the Python writer for registry.
pub static PYTHON_WRITER: PythonWriterImpl = PythonWriterImpl;

/// Python writer implementing the Writer trait.
pub struct PythonWriterImpl;

impl Writer for PythonWriterImpl {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extension(&self) -> &'static str {
        "py"
    }

    fn conventions(&self) -> &'static TargetConventions {
        &PYTHON_CONVENTIONS
    }

    fn indent_width(&self) -> usize {
        4
    }

    fn write_indented(&self, program: &Program, indent_width: usize) -> String {
        PythonWriter::with_indent_width(indent_width).finish(program)
    }
}

/// Emits IR as Python source code.
pub struct PythonWriter {
    output: String,
    indent: usize,
    indent_width: usize,
}

impl PythonWriter {
    pub fn new() -> Self {
        Self::with_indent_width(4)
    }

    pub fn with_indent_width(indent_width: usize) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            indent_width,
        }
    }

    /// Emit a program to Python source.
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

    fn write_stmt(&mut self, stmt: &Stmt) {
        self.write_indent();
        match stmt {
            Stmt::Expr(expr) => {
                self.write_expr(expr);
            }

            Stmt::Let { name, init, .. } => {
                // Python doesn't have variable declarations, just assignment
                self.output.push_str(name);
                if let Some(value) = init {
                    self.output.push_str(" = ");
                    self.write_expr(value);
                } else {
                    self.output.push_str(" = None");
                }
            }

            Stmt::Destructure { pattern, init } => {
                write!(self.output, "{} = ", pattern).unwrap();
                self.write_expr(init);
            }

            Stmt::Block(stmts) => {
                // Python doesn't have standalone blocks: drop the indent
                // written above and emit the statements in place
                let indent_len = self.indent * self.indent_width;
                self.output.truncate(self.output.len() - indent_len);
                self.write_suite(stmts);
                self.trim_trailing_newline();
            }

            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.output.push_str("if ");
                self.write_expr(test);
                self.output.push_str(":\n");
                self.indent += 1;
                self.write_block_body(consequent);
                self.indent -= 1;

                if let Some(alt) = alternate {
                    self.write_indent();
                    // Check if alternate is another If (elif)
                    if let Stmt::If { .. } = alt.as_ref() {
                        self.output.push_str("el");
                        self.write_stmt_no_indent(alt);
                    } else {
                        self.output.push_str("else:\n");
                        self.indent += 1;
                        self.write_block_body(alt);
                        self.indent -= 1;
                    }
                }
                self.trim_trailing_newline();
            }

            Stmt::While { test, body } => {
                self.output.push_str("while ");
                self.write_expr(test);
                self.output.push_str(":\n");
                self.indent += 1;
                self.write_block_body(body);
                self.indent -= 1;
                self.trim_trailing_newline();
            }

            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                // C-style for loops don't exist in Python
                // Convert to while loop
                if let Some(i) = init {
                    self.write_stmt(i);
                    self.output.push('\n');
                    self.write_indent();
                }
                self.output.push_str("while ");
                if let Some(t) = test {
                    self.write_expr(t);
                } else {
                    self.output.push_str("True");
                }
                self.output.push_str(":\n");
                self.indent += 1;
                self.write_block_body(body);
                if let Some(u) = update {
                    self.write_indent();
                    self.write_expr(u);
                    self.output.push('\n');
                }
                self.indent -= 1;
                self.trim_trailing_newline();
            }

            Stmt::ForIn {
                variable,
                iterable,
                body,
            } => {
                self.output.push_str("for ");
                self.output.push_str(variable);
                self.output.push_str(" in ");
                self.write_expr(iterable);
                self.output.push_str(":\n");
                self.indent += 1;
                self.write_block_body(body);
                self.indent -= 1;
                self.trim_trailing_newline();
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
                self.output.push_str("continue");
            }

            Stmt::Throw(expr) => {
                self.output.push_str("raise ");
                self.write_expr(expr);
            }

            Stmt::TryCatch {
                body,
                catch_param,
                catch_body,
                finally_body,
            } => {
                self.output.push_str("try:\n");
                self.indent += 1;
                self.write_block_body(body);
                self.indent -= 1;
                if let Some(cb) = catch_body {
                    self.write_indent();
                    match catch_param {
                        Some(param) => write!(self.output, "except BaseException as {}:\n", param).unwrap(),
                        None => self.output.push_str("except BaseException:\n"),
                    }
                    self.indent += 1;
                    self.write_block_body(cb);
                    self.indent -= 1;
                }
                if let Some(fb) = finally_body {
                    self.write_indent();
                    self.output.push_str("finally:\n");
                    self.indent += 1;
                    self.write_block_body(fb);
                    self.indent -= 1;
                }
                self.trim_trailing_newline();
            }

            Stmt::With(scoped) => {
                if scoped.is_async {
                    self.output.push_str("async ");
                }
                self.output.push_str("with ");
                for (i, item) in scoped.items.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_expr(&item.acquire);
                    if let Some(pattern) = &item.binding {
                        write!(self.output, " as {}", pattern).unwrap();
                    }
                }
                self.output.push_str(":\n");
                self.indent += 1;
                self.write_suite(&scoped.body);
                self.indent -= 1;
                self.trim_trailing_newline();
            }

            Stmt::Function(func) => {
                if func.is_async {
                    self.output.push_str("async ");
                }
                self.output.push_str("def ");
                if func.name.is_empty() {
                    self.output.push_str("_anonymous");
                } else {
                    self.output.push_str(&func.name);
                }
                self.output.push('(');
                self.output.push_str(&func.params.join(", "));
                self.output.push_str("):\n");
                self.indent += 1;
                self.write_suite(&func.body);
                self.indent -= 1;
                self.trim_trailing_newline();
            }
        }
    }

    fn write_suite(&mut self, stmts: &[Stmt]) {
        if stmts.is_empty() {
            self.write_indent();
            self.output.push_str("pass\n");
        } else {
            for s in stmts {
                self.write_stmt(s);
                self.output.push('\n');
            }
        }
    }

    fn trim_trailing_newline(&mut self) {
        if self.output.ends_with('\n') {
            self.output.pop();
        }
    }

    fn write_stmt_no_indent(&mut self, stmt: &Stmt) {
        // Write statement without leading indent (for elif)
        match stmt {
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.output.push_str("if ");
                self.write_expr(test);
                self.output.push_str(":\n");
                self.indent += 1;
                self.write_block_body(consequent);
                self.indent -= 1;

                if let Some(alt) = alternate {
                    self.write_indent();
                    if let Stmt::If { .. } = alt.as_ref() {
                        self.output.push_str("el");
                        self.write_stmt_no_indent(alt);
                    } else {
                        self.output.push_str("else:\n");
                        self.indent += 1;
                        self.write_block_body(alt);
                        self.indent -= 1;
                    }
                }
            }
            _ => self.write_stmt(stmt),
        }
    }

    fn write_block_body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) if stmts.is_empty() => {
                self.write_indent();
                self.output.push_str("pass\n");
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.write_stmt(s);
                    self.output.push('\n');
                }
            }
            _ => {
                self.write_stmt(stmt);
                self.output.push('\n');
            }
        }
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
                self.write_unary_op(*op);
                self.write_expr(expr);
            }

            Expr::Call { callee, args } => {
                self.write_expr(callee);
                self.output.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_expr(arg);
                }
                self.output.push(')');
            }

            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                if matches!(receiver.as_ref(), Expr::Await(_)) {
                    self.output.push('(');
                    self.write_expr(receiver);
                    self.output.push(')');
                } else {
                    self.write_expr(receiver);
                }
                write!(self.output, ".{}(", method).unwrap();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_expr(arg);
                }
                self.output.push(')');
            }

            Expr::Member {
                object,
                property,
                computed,
            } => {
                self.write_expr(object);
                if *computed {
                    self.output.push('[');
                    self.write_expr(property);
                    self.output.push(']');
                } else {
                    self.output.push('.');
                    // Extract property name from string literal
                    if let Expr::Literal(Literal::String(s)) = property.as_ref() {
                        self.output.push_str(s);
                    } else {
                        self.write_expr(property);
                    }
                }
            }

            Expr::Array(items) => {
                self.output.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_expr(item);
                }
                self.output.push(']');
            }

            Expr::Object(pairs) => {
                self.output.push('{');
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    // Python dict keys need quotes
                    let _ = write!(self.output, "\"{}\": ", key);
                    self.write_expr(value);
                }
                self.output.push('}');
            }

            Expr::Function(func) => {
                // Lambda if single return statement, otherwise can't express
                if func.body.len() == 1 {
                    if let Stmt::Return(Some(ret_expr)) = &func.body[0] {
                        self.output.push_str("lambda ");
                        self.output.push_str(&func.params.join(", "));
                        self.output.push_str(": ");
                        self.write_expr(ret_expr);
                        return;
                    }
                }
                // Can't express multi-statement function as expression in Python
                // Output as a comment or placeholder
                self.output.push_str("None  # complex function");
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                // Python ternary: consequent if test else alternate
                self.output.push('(');
                self.write_expr(consequent);
                self.output.push_str(" if ");
                self.write_expr(test);
                self.output.push_str(" else ");
                self.write_expr(alternate);
                self.output.push(')');
            }

            Expr::Assign { target, value } => {
                self.write_expr(target);
                self.output.push_str(" = ");
                self.write_expr(value);
            }

            Expr::Await(expr) => {
                self.output.push_str("await ");
                self.write_expr(expr);
            }
        }
    }

    fn write_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Null => self.output.push_str("None"),
            Literal::Bool(true) => self.output.push_str("True"),
            Literal::Bool(false) => self.output.push_str("False"),
            Literal::Number(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    let _ = write!(self.output, "{}", *n as i64);
                } else {
                    let _ = write!(self.output, "{}", n);
                }
            }
            Literal::String(s) => {
                // Escape and quote
                self.output.push('"');
                for c in s.chars() {
                    match c {
                        '"' => self.output.push_str("\\\""),
                        '\\' => self.output.push_str("\\\\"),
                        '\n' => self.output.push_str("\\n"),
                        '\r' => self.output.push_str("\\r"),
                        '\t' => self.output.push_str("\\t"),
                        _ => self.output.push(c),
                    }
                }
                self.output.push('"');
            }
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
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Concat => "+", // String concat in Python
        };
        self.output.push_str(s);
    }

    fn write_unary_op(&mut self, op: UnaryOp) {
        let s = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not ",
        };
        self.output.push_str(s);
    }
}

impl Default for PythonWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_assignment() {
        let program = Program {
            body: vec![Stmt::let_decl("x", Some(Expr::number(42)))],
        };
        let output = PythonWriter::emit(&program);
        assert_eq!(output.trim(), "x = 42");
    }

    #[test]
    fn test_function_call() {
        let program = Program {
            body: vec![Stmt::expr(Expr::call(
                Expr::ident("print"),
                vec![Expr::string("hello")],
            ))],
        };
        let output = PythonWriter::emit(&program);
        assert_eq!(output.trim(), "print(\"hello\")");
    }

    #[test]
    fn test_if_statement() {
        let program = Program {
            body: vec![Stmt::if_stmt(
                Expr::binary(Expr::ident("x"), BinaryOp::Gt, Expr::number(0)),
                Stmt::block(vec![Stmt::expr(Expr::call(
                    Expr::ident("print"),
                    vec![Expr::ident("x")],
                ))]),
                None,
            )],
        };
        let output = PythonWriter::emit(&program);
        assert!(output.contains("if (x > 0):"));
        assert!(output.contains("print(x)"));
    }

    #[test]
    fn test_function_definition() {
        let program = Program {
            body: vec![Stmt::function(Function::new(
                "add",
                vec!["a".into(), "b".into()],
                vec![Stmt::return_stmt(Some(Expr::binary(
                    Expr::ident("a"),
                    BinaryOp::Add,
                    Expr::ident("b"),
                )))],
            ))],
        };
        let output = PythonWriter::emit(&program);
        assert!(output.contains("def add(a, b):"));
        assert!(output.contains("return (a + b)"));
    }

    #[test]
    fn test_lambda() {
        let program = Program {
            body: vec![Stmt::let_decl(
                "add",
                Some(Expr::Function(Box::new(Function::anonymous(
                    vec!["a".into(), "b".into()],
                    vec![Stmt::return_stmt(Some(Expr::binary(
                        Expr::ident("a"),
                        BinaryOp::Add,
                        Expr::ident("b"),
                    )))],
                )))),
            )],
        };
        let output = PythonWriter::emit(&program);
        assert!(output.contains("lambda a, b: (a + b)"));
    }

    fn manager(name: &str) -> Expr {
        Expr::call(Expr::ident(name), vec![])
    }

    #[test]
    fn test_with_alias() {
        let program = Program::new(vec![Stmt::with(ScopedStatement::new(
            vec![ResourceItem::new(manager("context_manager")).bind(BindingPattern::name("alias"))],
            vec![],
        ))]);
        let output = PythonWriter::emit(&program);
        assert_eq!(output, "with context_manager() as alias:\n    pass\n");
    }

    #[test]
    fn test_with_tuple_alias() {
        let program = Program::new(vec![Stmt::with(ScopedStatement::new(
            vec![
                ResourceItem::new(manager("context_manager"))
                    .bind(BindingPattern::names(["a", "b"])),
            ],
            vec![],
        ))]);
        let output = PythonWriter::emit(&program);
        assert_eq!(output, "with context_manager() as (a, b):\n    pass\n");
    }

    #[test]
    fn test_with_many_items() {
        let program = Program::new(vec![Stmt::with(ScopedStatement::new(
            vec![
                ResourceItem::new(manager("context_manager")).bind(BindingPattern::name("alias")),
                ResourceItem::new(manager("context_manager2"))
                    .bind(BindingPattern::names(["a", "b"])),
                ResourceItem::new(manager("context_manager3")),
            ],
            vec![Stmt::expr(Expr::call(Expr::ident("print"), vec![Expr::ident("a")]))],
        ))]);
        let output = PythonWriter::emit(&program);
        assert_eq!(
            output,
            "with context_manager() as alias, context_manager2() as (a, b), context_manager3():\n    print(a)\n"
        );
    }

    #[test]
    fn test_async_with_in_async_def() {
        let program = Program::new(vec![Stmt::function(
            Function::new(
                "foo",
                vec![],
                vec![Stmt::with(ScopedStatement::new_async(
                    vec![ResourceItem::new(manager("context_manager"))],
                    vec![],
                ))],
            )
            .into_async(),
        )]);
        let output = PythonWriter::emit(&program);
        assert_eq!(
            output,
            "async def foo():\n    async with context_manager():\n        pass\n"
        );
    }

    #[test]
    fn test_try_except_finally() {
        let program = Program::new(vec![Stmt::try_catch(
            Stmt::block(vec![Stmt::expr(Expr::call(Expr::ident("work"), vec![]))]),
            Some("err".into()),
            Some(Stmt::block(vec![Stmt::throw(Expr::ident("err"))])),
            Some(Stmt::block(vec![Stmt::expr(Expr::method_call(
                Expr::ident("conn"),
                "close",
                vec![],
            ))])),
        )]);
        let output = PythonWriter::emit(&program);
        assert_eq!(
            output,
            "try:\n    work()\nexcept BaseException as err:\n    raise err\nfinally:\n    conn.close()\n"
        );
    }

    #[test]
    fn test_destructure_and_indent_width() {
        let program = Program::new(vec![Stmt::if_stmt(
            Expr::ident("ready"),
            Stmt::block(vec![Stmt::destructure(
                BindingPattern::names(["a"]),
                Expr::ident("pair"),
            )]),
            None,
        )]);
        let output = PYTHON_WRITER.write_indented(&program, 2);
        assert_eq!(output, "if ready:\n  (a,) = pair\n");
    }
}
