//! File system tools: read_file, write_file, create_file,
//! replace_file_content, list_dir, find_by_name, grep_search,
//! change_directory.

use anyhow::{bail, Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use super::{optional_str, required_str, ToolArgs, ToolContext, ToolOutput};
use crate::utils::resolve_directory;

/// Execute the `read_file` tool.
pub async fn execute_read_file(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let path = ctx.resolve(required_str(&args, "file_path")?);
    debug!("Reading file: {}", path.display());

    if !path.exists() {
        bail!("File not found at '{}'.", path.display());
    }
    if !path.is_file() {
        bail!("Path '{}' is a directory, not a file.", path.display());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Could not read file '{}'", path.display()))?;
    Ok(ToolOutput::Text(content))
}

/// Execute the `write_file` tool. Creates parent directories as needed.
pub async fn execute_write_file(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let path = ctx.resolve(required_str(&args, "file_path")?);
    let content = required_str(&args, "content")?;
    debug!("Writing {} bytes to {}", content.len(), path.display());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write to file '{}'", path.display()))?;

    Ok(ToolOutput::text(format!(
        "Successfully wrote to file at '{}'",
        path.display()
    )))
}

/// Execute the `create_file` tool. Refuses to overwrite.
pub async fn execute_create_file(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let path = ctx.resolve(required_str(&args, "file_path")?);
    let content = optional_str(&args, "content", "");

    if path.exists() {
        bail!(
            "File already exists at '{}'. Use 'replace_file_content' to modify it.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to create file '{}'", path.display()))?;

    Ok(ToolOutput::text(format!(
        "Successfully created file at '{}'.",
        path.display()
    )))
}

/// Execute the `replace_file_content` tool. The file must already exist.
pub async fn execute_replace_file_content(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let path = ctx.resolve(required_str(&args, "file_path")?);
    let new_content = required_str(&args, "new_content")?;

    if !path.is_file() {
        bail!("File not found at '{}'.", path.display());
    }
    std::fs::write(&path, new_content)
        .with_context(|| format!("Failed to replace file content of '{}'", path.display()))?;

    Ok(ToolOutput::text(format!(
        "Successfully replaced content of file '{}'.",
        path.display()
    )))
}

/// Execute the `list_dir` tool. Directories are suffixed with `/`.
pub async fn execute_list_dir(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let path = ctx.resolve(optional_str(&args, "directory_path", "."));

    if !path.is_dir() {
        bail!("Directory not found at '{}'.", path.display());
    }

    let mut entries: Vec<String> = std::fs::read_dir(&path)
        .with_context(|| format!("Failed to list directory contents of '{}'", path.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                format!("{}/", name)
            } else {
                name
            }
        })
        .collect();
    entries.sort();

    if entries.is_empty() {
        return Ok(ToolOutput::text(format!(
            "Directory '{}' is empty.",
            path.display()
        )));
    }
    Ok(ToolOutput::Text(entries.join("\n")))
}

/// Execute the `find_by_name` tool: recursive exact-name search.
pub async fn execute_find_by_name(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let name = required_str(&args, "name")?;
    let search_dir = ctx.resolve(optional_str(&args, "search_dir", "."));

    if !search_dir.is_dir() {
        bail!("Directory not found at '{}'.", search_dir.display());
    }

    let results: Vec<String> = WalkDir::new(&search_dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy() == name)
        .map(|entry| entry.path().display().to_string())
        .collect();

    if results.is_empty() {
        return Ok(ToolOutput::text(format!(
            "No files or directories found with the name '{}' in '{}'.",
            name,
            search_dir.display()
        )));
    }
    Ok(ToolOutput::Text(results.join("\n")))
}

/// Execute the `grep_search` tool: substring search, `path:line:text`.
pub async fn execute_grep_search(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let pattern = required_str(&args, "pattern")?;
    let search_dir = ctx.resolve(optional_str(&args, "search_dir", "."));

    if !search_dir.is_dir() {
        bail!("Directory not found at '{}'.", search_dir.display());
    }

    let mut results = Vec::new();
    for entry in WalkDir::new(&search_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
    {
        // unreadable and binary files are skipped
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        let content = String::from_utf8_lossy(&bytes);
        for (i, line) in content.lines().enumerate() {
            if line.contains(pattern) {
                results.push(format!("{}:{}:{}", entry.path().display(), i + 1, line.trim()));
            }
        }
    }

    if results.is_empty() {
        return Ok(ToolOutput::text(format!(
            "No matches found for pattern '{}' in '{}'.",
            pattern,
            search_dir.display()
        )));
    }
    Ok(ToolOutput::Text(results.join("\n")))
}

/// Execute the `change_directory` tool.
pub async fn execute_change_directory(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let requested = required_str(&args, "path")?;
    match resolve_directory(ctx.working_dir(), requested) {
        Ok(dir) => Ok(ToolOutput::DirectoryChanged(dir)),
        Err(reason) => bail!("Cannot change directory to '{}': {}.", requested, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexia_execution::ProcessSupervisor;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> ToolContext {
        ToolContext::new(Arc::new(ProcessSupervisor::new())).with_working_dir(dir.path())
    }

    fn args(value: serde_json::Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_write_then_read_relative_to_working_dir() {
        let temp_dir = TempDir::new().unwrap();

        let out = execute_write_file(
            args(json!({"file_path": "nested/dir/a.txt", "content": "hello"})),
            ctx(&temp_dir),
        )
        .await
        .unwrap();
        assert!(out.render().starts_with("Successfully wrote"));
        assert!(temp_dir.path().join("nested/dir/a.txt").exists());

        let out = execute_read_file(args(json!({"file_path": "nested/dir/a.txt"})), ctx(&temp_dir))
            .await
            .unwrap();
        assert_eq!(out, ToolOutput::text("hello"));
    }

    #[tokio::test]
    async fn test_read_missing_and_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let err = execute_read_file(args(json!({"file_path": "nope.txt"})), ctx(&temp_dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));

        let err = execute_read_file(args(json!({"file_path": "sub"})), ctx(&temp_dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is a directory"));
    }

    #[tokio::test]
    async fn test_create_file_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        execute_create_file(args(json!({"file_path": "new.txt"})), ctx(&temp_dir))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(temp_dir.path().join("new.txt")).unwrap(), "");

        let err = execute_create_file(
            args(json!({"file_path": "new.txt", "content": "x"})),
            ctx(&temp_dir),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_replace_requires_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = execute_replace_file_content(
            args(json!({"file_path": "absent.txt", "new_content": "x"})),
            ctx(&temp_dir),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("File not found"));

        std::fs::write(temp_dir.path().join("present.txt"), "old").unwrap();
        execute_replace_file_content(
            args(json!({"file_path": "present.txt", "new_content": "new"})),
            ctx(&temp_dir),
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("present.txt")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_list_dir_sorted_with_dir_suffix() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.txt"), "").unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(temp_dir.path().join("src")).unwrap();

        let out = execute_list_dir(args(json!({})), ctx(&temp_dir)).await.unwrap();
        assert_eq!(out.render(), "a.txt\nb.txt\nsrc/");
    }

    #[tokio::test]
    async fn test_find_by_name_recurses() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
        std::fs::write(temp_dir.path().join("a/b/target.rs"), "").unwrap();

        let out = execute_find_by_name(args(json!({"name": "target.rs"})), ctx(&temp_dir))
            .await
            .unwrap();
        assert!(out.render().ends_with("a/b/target.rs"));

        let out = execute_find_by_name(args(json!({"name": "ghost.rs"})), ctx(&temp_dir))
            .await
            .unwrap();
        assert!(out.render().starts_with("No files or directories found"));
    }

    #[tokio::test]
    async fn test_grep_search_reports_line_numbers() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "alpha\n  needle here\ngamma\n").unwrap();

        let out = execute_grep_search(args(json!({"pattern": "needle"})), ctx(&temp_dir))
            .await
            .unwrap();
        assert!(out.render().ends_with("notes.txt:2:needle here"));
    }

    #[tokio::test]
    async fn test_change_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let out = execute_change_directory(args(json!({"path": "sub"})), ctx(&temp_dir))
            .await
            .unwrap();
        assert_eq!(
            out,
            ToolOutput::DirectoryChanged(temp_dir.path().join("sub").canonicalize().unwrap())
        );

        let err = execute_change_directory(args(json!({"path": "missing"})), ctx(&temp_dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cannot change directory"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = execute_write_file(args(json!({"file_path": "x"})), ctx(&temp_dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing required argument 'content'"));
    }
}
