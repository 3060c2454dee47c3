//! Registry for writers.

use crate::traits::Writer;
use std::sync::{OnceLock, RwLock};

/// Global writer registry.
static WRITERS: RwLock<Vec<&'static dyn Writer>> = RwLock::new(Vec::new());
static WRITERS_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register a custom writer.
///
/// Lookups return the first writer registered for a language.
pub fn register_writer(writer: &'static dyn Writer) {
    WRITERS.write().unwrap().push(writer);
}

fn init_writers() {
    WRITERS_INITIALIZED.get_or_init(|| {
        #[cfg(feature = "write-python")]
        {
            register_writer(&crate::output::python::PYTHON_WRITER);
        }
        #[cfg(feature = "write-typescript")]
        {
            register_writer(&crate::output::typescript::TYPESCRIPT_WRITER);
        }
        #[cfg(feature = "write-lua")]
        {
            register_writer(&crate::output::lua::LUA_WRITER);
        }
    });
}

/// Get a writer by language name.
pub fn writer_for_language(lang: &str) -> Option<&'static dyn Writer> {
    init_writers();
    WRITERS
        .read()
        .unwrap()
        .iter()
        .find(|w| w.language() == lang)
        .copied()
}

/// Get a writer by output file extension.
pub fn writer_for_extension(ext: &str) -> Option<&'static dyn Writer> {
    init_writers();
    WRITERS
        .read()
        .unwrap()
        .iter()
        .find(|w| w.extension() == ext)
        .copied()
}

/// Get all registered writers.
pub fn writers() -> Vec<&'static dyn Writer> {
    init_writers();
    WRITERS.read().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "write-lua")]
    fn test_writer_lookup() {
        let writer = writer_for_language("lua").expect("lua writer");
        assert_eq!(writer.language(), "lua");
        assert_eq!(writer.extension(), "lua");
        assert!(!writer.conventions().supports_suspension);
    }

    #[test]
    #[cfg(feature = "write-typescript")]
    fn test_typescript_writer_lookup() {
        let writer = writer_for_language("typescript").expect("typescript writer");
        assert_eq!(writer.language(), "typescript");
        assert_eq!(writer.extension(), "ts");

        let by_ext = writer_for_extension("ts").expect("ts extension");
        assert_eq!(by_ext.language(), "typescript");
    }

    #[test]
    #[cfg(feature = "write-python")]
    fn test_python_writer_lookup() {
        let writer = writer_for_language("python").expect("python writer");
        assert_eq!(writer.extension(), "py");
        assert_eq!(writer.indent_width(), 4);
    }

    #[test]
    fn test_every_writer_has_matching_conventions() {
        for writer in writers() {
            assert_eq!(writer.language(), writer.conventions().language);
        }
    }

    #[test]
    fn test_unknown_language() {
        assert!(writer_for_language("cobol").is_none());
    }
}
