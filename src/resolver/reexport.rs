//! Re-export scanner for declaration files
//!
//! Parses declaration text with the TypeScript grammar and collects the
//! module specifier of every `export ... from "<target>"` statement:
//!
//! - `export { a, b as c } from "x"` (may span lines)
//! - `export * from "x"` / `export * as ns from "x"`
//! - `export type { T } from "x"`
//!
//! Comments, strings and template literals never produce an export
//! statement node, so text that merely looks like a re-export is ignored.

use tree_sitter::{Parser as TsParser, Query, QueryCursor, StreamingIterator};

use crate::types::{RagError, Result};

const REEXPORT_QUERY: &str = r#"
    (export_statement
        source: (string) @source
    )
"#;

/// Module specifiers of every re-export statement, in source order
pub fn reexport_targets(source: &str) -> Result<Vec<String>> {
    let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();

    let mut parser = TsParser::new();
    parser
        .set_language(&language)
        .map_err(|e| RagError::Parse(format!("Failed to set TypeScript language: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| RagError::Parse("Failed to parse declaration file".to_string()))?;

    let query = Query::new(&language, REEXPORT_QUERY)
        .map_err(|e| RagError::Parse(format!("Invalid re-export query: {}", e)))?;

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());

    let mut targets = Vec::new();
    while let Some(m) = matches.next() {
        for cap in m.captures.iter() {
            let text = cap.node.utf8_text(source.as_bytes()).unwrap_or("");
            targets.push(text.trim_matches(|c| c == '"' || c == '\'').to_string());
        }
    }

    Ok(targets)
}

/// Whether a specifier points into the same package
pub fn is_relative(target: &str) -> bool {
    target == "." || target == ".." || target.starts_with("./") || target.starts_with("../")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_forms() {
        let source = r#"
            export * from "./core";
            export * as utils from './utils';
            export { a, b as c } from "./named";
            export type { Options } from "./options";
            export { default } from "other-pkg";
        "#;

        assert_eq!(
            reexport_targets(source).unwrap(),
            vec!["./core", "./utils", "./named", "./options", "other-pkg"]
        );
    }

    #[test]
    fn test_multiline_braces() {
        let source = "export {\n  first,\n  second,\n  type Third,\n} from\n  \"./multi\";";
        assert_eq!(reexport_targets(source).unwrap(), vec!["./multi"]);
    }

    #[test]
    fn test_comments_and_strings_are_skipped() {
        let source = r#"
            // export * from "./line-comment";
            /*
             * export { x } from "./block-comment";
             */
            declare const doc: "export * from './inside-string'";
            const tpl = `export * from "./template"`;
            export * from "./real";
        "#;

        assert_eq!(reexport_targets(source).unwrap(), vec!["./real"]);
    }

    #[test]
    fn test_local_exports_and_imports_are_ignored() {
        let source = r#"
            import { thing } from "./imported";
            export declare const origin: string;
            export interface Shape { from: string }
            export { thing };
            export default thing;
        "#;

        assert!(reexport_targets(source).unwrap().is_empty());
    }

    #[test]
    fn test_newer_syntax_does_not_hide_other_reexports() {
        let source = r#"
            export * from "./before";
            export type * from "./all-types";
            export { after } from "./after";
        "#;

        let targets = reexport_targets(source).unwrap();
        assert!(targets.contains(&"./before".to_string()));
        assert!(targets.contains(&"./after".to_string()));
    }

    #[test]
    fn test_is_relative() {
        assert!(is_relative("./a"));
        assert!(is_relative("../a"));
        assert!(is_relative("."));
        assert!(is_relative(".."));
        assert!(!is_relative("lodash"));
        assert!(!is_relative("@scope/pkg"));
        assert!(!is_relative(".hidden"));
    }
}
