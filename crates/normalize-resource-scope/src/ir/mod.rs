//! Surface-syntax IR.
//!
//! A small imperative IR shared by every writer. Scoped-resource statements
//! live here as [`Stmt::With`]; lowering replaces them with target scaffolding
//! (or keeps them for targets with a native construct).

mod resource;
mod structure_eq;

pub use resource::{BindingPattern, ResourceItem, ScopedStatement};
pub use structure_eq::StructureEq;

use serde::{Deserialize, Serialize};

/// A complete program: a sequence of top-level statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression evaluated for its side effects.
    Expr(Expr),

    /// Variable declaration. `mutable` distinguishes `let` from `const`.
    Let {
        name: String,
        init: Option<Expr>,
        mutable: bool,
    },

    /// Declaration that unpacks a sequence value into a binding pattern.
    Destructure { pattern: BindingPattern, init: Expr },

    Block(Vec<Stmt>),

    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },

    While {
        test: Expr,
        body: Box<Stmt>,
    },

    /// C-style `for (init; test; update)`.
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },

    ForIn {
        variable: String,
        iterable: Expr,
        body: Box<Stmt>,
    },

    Return(Option<Expr>),
    Break,
    Continue,

    /// Raise / throw an error value.
    Throw(Expr),

    TryCatch {
        body: Box<Stmt>,
        catch_param: Option<String>,
        catch_body: Option<Box<Stmt>>,
        finally_body: Option<Box<Stmt>>,
    },

    Function(Function),

    /// Scoped-resource statement (`with a() as x, b():`).
    With(ScopedStatement),
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Ident(String),

    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Method invocation on a receiver (`obj.m(a)` / `obj:m(a)` in Lua).
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },

    /// Property access. `computed` means bracket syntax (`obj[prop]`).
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },

    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Function(Box<Function>),

    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Suspension point.
    Await(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// A function declaration or anonymous function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Empty for anonymous functions.
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Whether the body may contain suspension points.
    #[serde(default)]
    pub is_async: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params,
            body,
            is_async: false,
        }
    }

    pub fn anonymous(params: Vec<String>, body: Vec<Stmt>) -> Self {
        Self::new("", params, body)
    }

    /// Mark the function as asynchronous.
    pub fn into_async(mut self) -> Self {
        self.is_async = true;
        self
    }
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn let_decl(name: impl Into<String>, init: Option<Expr>) -> Self {
        Stmt::Let {
            name: name.into(),
            init,
            mutable: true,
        }
    }

    pub fn const_decl(name: impl Into<String>, init: Expr) -> Self {
        Stmt::Let {
            name: name.into(),
            init: Some(init),
            mutable: false,
        }
    }

    pub fn destructure(pattern: BindingPattern, init: Expr) -> Self {
        Stmt::Destructure { pattern, init }
    }

    pub fn block(stmts: Vec<Stmt>) -> Self {
        Stmt::Block(stmts)
    }

    pub fn if_stmt(test: Expr, consequent: Stmt, alternate: Option<Stmt>) -> Self {
        Stmt::If {
            test,
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        }
    }

    pub fn while_loop(test: Expr, body: Stmt) -> Self {
        Stmt::While {
            test,
            body: Box::new(body),
        }
    }

    pub fn for_loop(
        init: Option<Stmt>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Stmt,
    ) -> Self {
        Stmt::For {
            init: init.map(Box::new),
            test,
            update,
            body: Box::new(body),
        }
    }

    pub fn for_in(variable: impl Into<String>, iterable: Expr, body: Stmt) -> Self {
        Stmt::ForIn {
            variable: variable.into(),
            iterable,
            body: Box::new(body),
        }
    }

    pub fn return_stmt(expr: Option<Expr>) -> Self {
        Stmt::Return(expr)
    }

    pub fn break_stmt() -> Self {
        Stmt::Break
    }

    pub fn continue_stmt() -> Self {
        Stmt::Continue
    }

    pub fn throw(expr: Expr) -> Self {
        Stmt::Throw(expr)
    }

    pub fn try_catch(
        body: Stmt,
        catch_param: Option<String>,
        catch_body: Option<Stmt>,
        finally_body: Option<Stmt>,
    ) -> Self {
        Stmt::TryCatch {
            body: Box::new(body),
            catch_param,
            catch_body: catch_body.map(Box::new),
            finally_body: finally_body.map(Box::new),
        }
    }

    pub fn function(f: Function) -> Self {
        Stmt::Function(f)
    }

    pub fn with(stmt: ScopedStatement) -> Self {
        Stmt::With(stmt)
    }
}

impl Expr {
    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal(Literal::Bool(b))
    }

    pub fn number(n: impl Into<f64>) -> Self {
        Expr::Literal(Literal::Number(n.into()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(s.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn not(expr: Expr) -> Self {
        Self::unary(UnaryOp::Not, expr)
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn method_call(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::MethodCall {
            receiver: Box::new(receiver),
            method: method.into(),
            args,
        }
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: Box::new(Expr::string(property)),
            computed: false,
        }
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: Box::new(index),
            computed: true,
        }
    }

    pub fn array(items: Vec<Expr>) -> Self {
        Expr::Array(items)
    }

    pub fn object(pairs: Vec<(String, Expr)>) -> Self {
        Expr::Object(pairs)
    }

    pub fn conditional(test: Expr, consequent: Expr, alternate: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn awaited(expr: Expr) -> Self {
        Expr::Await(Box::new(expr))
    }
}
