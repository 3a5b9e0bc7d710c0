//! Project search tools

use async_trait::async_trait;
use globset::{Glob, GlobBuilder, GlobMatcher};
use regex::RegexBuilder;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::path_utils::validate_workspace_path;
use super::{ToolContext, ToolResult, ToolTrait};

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "__pycache__"];

fn current_dir_arg() -> String {
    ".".to_string()
}

fn default_glob_limit() -> usize {
    200
}

fn default_grep_limit() -> usize {
    100
}

/// Hidden entries and build output, except the search root itself
fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir() && SKIPPED_DIRS.iter().any(|dir| *dir == name)
}

fn walk(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry))
        .filter_map(|entry| entry.ok())
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

fn truncated(mut lines: Vec<String>, total: usize) -> String {
    if total > lines.len() {
        lines.push(format!("... ({} more)", total - lines.len()));
    }
    lines.join("\n")
}

/// Find files by glob pattern
pub struct GlobTool;

#[derive(Deserialize)]
struct GlobArgs {
    pattern: String,
    #[serde(default = "current_dir_arg")]
    path: String,
    #[serde(default = "default_glob_limit")]
    limit: usize,
}

fn glob_matcher(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

#[async_trait]
impl ToolTrait for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }
    fn description(&self) -> &str {
        "Find files whose path matches a glob pattern, e.g. `**/*.rs` or `src/*.toml`. `*` does not cross directories."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Glob pattern, relative to the search directory" },
                "path": { "type": "string", "description": "Directory to search (default: current)" },
                "limit": { "type": "integer", "description": "Maximum number of paths (default: 200)" }
            },
            "required": ["pattern"]
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: GlobArgs = serde_json::from_value(args)?;
        if args.pattern.starts_with('/') || args.pattern.split('/').any(|part| part == "..") {
            return Err(format!(
                "Pattern must stay inside the search directory: {}",
                args.pattern
            )
            .into());
        }
        let matcher = glob_matcher(&args.pattern)?;
        let root = validate_workspace_path(&args.path, &ctx.working_dir).await?;

        debug!("Glob {} in {:?}", args.pattern, root);
        if !root.is_dir() {
            return Ok(format!("Directory not found: {}", args.path));
        }

        let matches: Vec<String> = walk(&root)
            .filter(|entry| entry.depth() > 0 && entry.file_type().is_file())
            .map(|entry| relative(entry.path(), &root))
            .filter(|path| matcher.is_match(path))
            .collect();

        if matches.is_empty() {
            return Ok(format!("No files matching {}", args.pattern));
        }
        let total = matches.len();
        Ok(truncated(matches.into_iter().take(args.limit).collect(), total))
    }
}

/// Search file contents with a regular expression
pub struct GrepTool;

#[derive(Deserialize)]
struct GrepArgs {
    pattern: String,
    #[serde(default = "current_dir_arg")]
    path: String,
    include: Option<String>,
    #[serde(default)]
    case_insensitive: bool,
    #[serde(default = "default_grep_limit")]
    max_results: usize,
}

fn files_under(root: &Path, include: Option<&GlobMatcher>) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    walk(root)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| include.map_or(true, |m| m.is_match(entry.file_name())))
        .map(DirEntry::into_path)
        .collect()
}

#[async_trait]
impl ToolTrait for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Search file contents for a regular expression. Returns `path:line: text` for each matching line."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Regular expression" },
                "path": { "type": "string", "description": "File or directory to search (default: current)" },
                "include": { "type": "string", "description": "Only search files whose name matches this glob, e.g. `*.rs`" },
                "case_insensitive": { "type": "boolean", "description": "Ignore case (default: false)" },
                "max_results": { "type": "integer", "description": "Maximum number of matching lines (default: 100)" }
            },
            "required": ["pattern"]
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: GrepArgs = serde_json::from_value(args)?;
        let regex = RegexBuilder::new(&args.pattern)
            .case_insensitive(args.case_insensitive)
            .build()?;
        let include = match &args.include {
            Some(glob) => Some(Glob::new(glob)?.compile_matcher()),
            None => None,
        };
        let root = validate_workspace_path(&args.path, &ctx.working_dir).await?;

        debug!("Grep {} in {:?}", args.pattern, root);
        if !root.exists() {
            return Ok(format!("Path not found: {}", args.path));
        }

        let mut found = Vec::new();
        for file in files_under(&root, include.as_ref()) {
            if ctx.interrupt.is_requested() {
                break;
            }
            // binary and unreadable files are skipped
            let Ok(content) = tokio::fs::read_to_string(&file).await else {
                continue;
            };
            let shown = if file == root {
                args.path.clone()
            } else {
                relative(&file, &root)
            };
            for (number, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    found.push(format!("{}:{}: {}", shown, number + 1, line.trim()));
                }
            }
        }

        if found.is_empty() {
            return Ok(format!("No matches for {}", args.pattern));
        }
        let total = found.len();
        Ok(truncated(found.into_iter().take(args.max_results).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_star_stays_in_one_directory() {
        let matcher = glob_matcher("*.rs").unwrap();
        assert!(matcher.is_match("main.rs"));
        assert!(!matcher.is_match("src/main.rs"));

        let recursive = glob_matcher("**/*.rs").unwrap();
        assert!(recursive.is_match("src/main.rs"));
        assert!(recursive.is_match("main.rs"));
    }

    #[test]
    fn test_truncated_reports_remainder() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(truncated(lines.clone(), 2), "a\nb");
        assert_eq!(truncated(lines, 5), "a\nb\n... (3 more)");
    }
}
