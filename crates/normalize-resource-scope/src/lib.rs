//! Transpilation of scoped-resource statements.
//!
//! `normalize-resource-scope` takes a scoped-resource statement (`with a() as
//! x, b() as (y, z):`) from a common IR and re-expresses it in a target
//! language, keeping its ordering and error-suppression behaviour: items are
//! acquired left to right, released right to left on every exit path, and a
//! release handler returning a truthy value swallows the propagating error.
//!
//! # Architecture
//!
//! ```text
//! ScopedStatement ─> binding ─> plan ─> lower ──> Program ─> Writer
//!  (ir)              resolve    order   expand     (ir)      python / typescript / lua
//! ```
//!
//! Targets with a native construct (Python) keep it. The others get one
//! guarded region per item: `try`/`catch`/`finally` for TypeScript, `pcall`
//! for Lua. [`outcome`] holds a reference interpreter of the same contract.
//!
//! # Example
//!
//! ```ignore
//! use normalize_resource_scope::*;
//!
//! let stmt = ScopedStatement::new(
//!     vec![ResourceItem::new(Expr::call(Expr::ident("open"), vec![]))
//!         .bind(BindingPattern::name("f"))],
//!     vec![Stmt::expr(Expr::call(Expr::ident("read"), vec![Expr::ident("f")]))],
//! );
//! let config = LoweringConfig::default();
//! let ts = transpile_scoped_statement(&stmt, config.writer()?, &config)?;
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod ir;
pub mod lower;
pub mod outcome;
pub mod output;
pub mod plan;
pub mod registry;
pub mod target;
pub mod traits;

// Re-exports: IR types
pub use ir::{
    BinaryOp, BindingPattern, Expr, Function, Literal, Program, ResourceItem, ScopedStatement,
    Stmt, StructureEq, UnaryOp,
};

// Re-exports: lowering
pub use config::LoweringConfig;
pub use error::{ConfigError, LowerError};
pub use lower::{
    lower_program, lower_scoped_statement, transpile_batch, transpile_program,
    transpile_scoped_statement,
};
pub use target::{ExpansionStyle, TargetConventions, conventions_for_language};

// Re-exports: Traits
pub use traits::Writer;

// Re-exports: Registry
pub use registry::{register_writer, writer_for_extension, writer_for_language, writers};

// Re-exports: Built-in writers
#[cfg(feature = "write-lua")]
pub use output::LuaWriter;
#[cfg(feature = "write-lua")]
pub use output::lua::LuaWriterImpl;
#[cfg(feature = "write-python")]
pub use output::PythonWriter;
#[cfg(feature = "write-python")]
pub use output::python::PythonWriterImpl;
#[cfg(feature = "write-typescript")]
pub use output::TypeScriptWriter;
#[cfg(feature = "write-typescript")]
pub use output::typescript::TypeScriptWriterImpl;
