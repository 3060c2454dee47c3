//! Trait for target-language writers.

use crate::ir::Program;
use crate::target::TargetConventions;

/// A writer emits the IR as source code in a target language.
///
/// Writers print IR that has been lowered with
/// [`conventions`](Writer::conventions); see [`crate::lower`]. Only targets
/// with a native construct print `Stmt::With`. The others print it as a
/// statement that raises when run, so use the `transpile_*` functions rather
/// than writing unlowered trees directly.
pub trait Writer: Send + Sync {
    /// Language identifier (e.g., "lua", "typescript").
    fn language(&self) -> &'static str;

    /// File extension for output (e.g., "lua").
    fn extension(&self) -> &'static str;

    /// Resource-scoping conventions this writer's output follows.
    fn conventions(&self) -> &'static TargetConventions;

    /// Default indentation width in spaces.
    fn indent_width(&self) -> usize;

    /// Emit the IR as source code with the given indentation width.
    fn write_indented(&self, program: &Program, indent_width: usize) -> String;

    /// Emit the IR as source code.
    fn write(&self, program: &Program) -> String {
        self.write_indented(program, self.indent_width())
    }
}
