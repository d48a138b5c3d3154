//! Integration tests for the lexer.
//!
//! Component: Lexer
//!
//! These tests verify:
//! - Token positions across files
//! - Include expansion, cycles and missing files
//! - Multi-file concatenation order

#![cfg(test)]

use crate::common::*;

use pila::*;

mod includes {
    use super::*;

    #[test]
    fn include_is_spliced_in_place() {
        // Arrange
        let tree = SourceTree::new();
        tree.file("lib/util.pila", "proc twice in i64 out i64 2 * end");
        let main = tree.file("main.pila", "@include \"lib/util.pila\"\n21 twice print\n");

        // Act
        let stream = lex_file(&main).unwrap();

        // Assert
        let texts = stream.texts();
        assert_eq!(texts[..2], ["proc", "twice"]);
        assert_eq!(texts[texts.len() - 3..], ["21", "twice", "print"]);
    }

    #[test]
    fn include_resolves_relative_to_including_file() {
        let tree = SourceTree::new();
        tree.file("a/b/leaf.pila", "7 print");
        tree.file("a/mid.pila", "@include \"b/leaf.pila\"");
        let main = tree.file("main.pila", "@include \"a/mid.pila\"");

        let stream = lex_file(&main).unwrap();

        assert_eq!(stream.texts(), vec!["7", "print"]);
        let token = stream.get(0).unwrap();
        assert!(token.file.as_deref().unwrap().ends_with("leaf.pila"));
        assert_eq!((token.line, token.column), (1, 1));
    }

    #[test]
    fn include_cycle_is_a_syntax_error() {
        let tree = SourceTree::new();
        tree.file("a.pila", "@include \"b.pila\"");
        tree.file("b.pila", "@include \"a.pila\"");

        let err = lex_file(&tree.dir.path().join("a.pila")).unwrap_err();

        assert!(matches!(err, PilaError::Syntax { ref message, .. } if message.contains("include cycle")));
    }

    #[test]
    fn missing_include_is_io_error() {
        let tree = SourceTree::new();
        let main = tree.file("main.pila", "@include \"nope.pila\"");

        let err = lex_file(&main).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn include_requires_quoted_path() {
        let tree = SourceTree::new();
        let main = tree.file("main.pila", "@include nope.pila");

        let err = lex_file(&main).unwrap_err();

        assert!(matches!(err, PilaError::Syntax { .. }));
    }
}

mod files {
    use super::*;

    #[test]
    fn root_files_concatenate_in_order() {
        let tree = SourceTree::new();
        let a = tree.file("a.pila", "1 print");
        let b = tree.file("b.pila", "2 print");

        let stream = lex_files(&[b, a]).unwrap();

        assert_eq!(stream.texts(), vec!["2", "print", "1", "print"]);
    }

    #[test]
    fn comments_and_strings() {
        let tokens = tokenize("\"a // b\" puts // trailing\n", None).unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "\"a // b\"");
    }

    #[test]
    fn unterminated_string_reports_its_start() {
        let err = tokenize("1 \"oops", None).unwrap_err();

        let location = err.location().unwrap();
        assert_eq!((location.line, location.column), (1, 3));
    }
}
