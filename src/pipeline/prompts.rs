//! Summarization Prompts
//!
//! Fixed instruction templates for the three request classes: file summary,
//! directory synthesis and dependency usage guide.

/// Ask for a summary of one file's content
pub fn file_summary_prompt(content: &str) -> String {
    format!(
        "This is the code of a file:\n```\n{}\n```\n\nPlease give me a summary of what this file does.",
        content
    )
}

/// Ask for a synthesis of a directory's child summaries
pub fn directory_summary_prompt<S: AsRef<str>>(summaries: &[S]) -> String {
    let joined = summaries
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "This is a list of file summaries in a directory:\n\n{}\n\nPlease give me a summary of all files in this directory.",
        joined
    )
}

/// Usage-guide prompt for a dependency's top-level entry, with its README
pub fn usage_guide_with_readme_prompt(dependency: &str, readme: &str, types: &str) -> String {
    format!(
        "Could you generate some usage examples from this README and typescript definitions of a dependency called \"{}\"?\n\n{}\n\n```ts\n{}\n```",
        dependency, readme, types
    )
}

/// Usage-guide prompt for a subpath or companion entry, named after the
/// dependency it belongs to
pub fn usage_guide_prompt(dependency: &str, types: &str) -> String {
    format!(
        "Could you generate some usage examples from these typescript definitions of a dependency called \"{}\"?\n\n```ts\n{}\n```",
        dependency, types
    )
}
