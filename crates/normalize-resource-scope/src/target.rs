//! Resource-scoping conventions of each target language.
//!
//! A target answers four questions for the lowering: how a resource is
//! acquired (its entry handler), how it is released (its exit handler), how a
//! release reports suppression, and whether one acquisition can be unpacked
//! into several names natively. Every built-in target signals suppression the
//! same way: the exit handler returns a truthy value.

/// How a target expresses a scoped statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionStyle {
    /// The target has an equivalent construct (`with` / `async with`).
    Native,
    /// Nested `try`/`catch`/`finally` blocks, one per item.
    TryCatchFinally,
    /// Nested protected calls (`pcall`), one per item.
    ProtectedCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConventions {
    pub language: &'static str,
    pub expansion: ExpansionStyle,
    /// Entry handler, called once per item before the body runs.
    pub enter_method: &'static str,
    /// Exit handler, called with the propagating error or null; truthy
    /// return suppresses the error.
    pub exit_method: &'static str,
    /// Whether tuple patterns can be emitted as destructuring declarations.
    pub native_unpacking: bool,
    /// First index used when unpacking by explicit indexing.
    pub index_base: usize,
    /// Whether acquire/release calls can be suspension points.
    pub supports_suspension: bool,
}

pub static PYTHON_CONVENTIONS: TargetConventions = TargetConventions {
    language: "python",
    expansion: ExpansionStyle::Native,
    enter_method: "__enter__",
    exit_method: "__exit__",
    native_unpacking: true,
    index_base: 0,
    supports_suspension: true,
};

pub static TYPESCRIPT_CONVENTIONS: TargetConventions = TargetConventions {
    language: "typescript",
    expansion: ExpansionStyle::TryCatchFinally,
    enter_method: "enter",
    exit_method: "exit",
    native_unpacking: true,
    index_base: 0,
    supports_suspension: true,
};

pub static LUA_CONVENTIONS: TargetConventions = TargetConventions {
    language: "lua",
    expansion: ExpansionStyle::ProtectedCall,
    enter_method: "enter",
    exit_method: "exit",
    native_unpacking: false,
    index_base: 1,
    supports_suspension: false,
};

/// Built-in conventions by language name.
pub fn conventions_for_language(lang: &str) -> Option<&'static TargetConventions> {
    [&PYTHON_CONVENTIONS, &TYPESCRIPT_CONVENTIONS, &LUA_CONVENTIONS]
        .into_iter()
        .find(|c| c.language == lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(
            conventions_for_language("lua").map(|c| c.expansion),
            Some(ExpansionStyle::ProtectedCall)
        );
        assert!(conventions_for_language("cobol").is_none());
    }
}
