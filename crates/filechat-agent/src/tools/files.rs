//! Built-in file tools: read_file, list_files, edit_file, new_file

use super::{ToolContext, ToolDescriptor, ToolError, ToolOutput};
use filechat_core::file_io;
use serde::Deserialize;

/// Input for `read_file`
#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileInput {
    pub path: String,
}

/// Input for `list_files`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilesInput {
    #[serde(default)]
    pub path: Option<String>,
}

/// Input for `edit_file`
#[derive(Debug, Clone, Deserialize)]
pub struct EditFileInput {
    pub path: String,
    pub old_str: String,
    pub new_str: String,
}

/// Input for `new_file`
#[derive(Debug, Clone, Deserialize)]
pub struct NewFileInput {
    pub path: String,
    pub content: String,
}

/// Create the read_file tool definition
pub fn read_file_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "read_file",
        "Read the contents of a given relative file path. Use this when you want to see what's inside a file. Do not use this with directory names.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The relative path of a file in the working directory."
                }
            },
            "required": ["path"]
        }),
        read_file,
    )
}

/// Create the list_files tool definition
pub fn list_files_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "list_files",
        "List files and directories at a given path. If no path is provided, lists files in the current directory.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Optional relative path to list files from. Defaults to current directory if not provided."
                }
            }
        }),
        list_files,
    )
}

/// Create the edit_file tool definition
pub fn edit_file_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "edit_file",
        "Make edits to a text file. Replaces 'old_str' with 'new_str' in the given file. 'old_str' and 'new_str' MUST be different from each other. If the file specified with path doesn't exist, it will be created.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file"
                },
                "old_str": {
                    "type": "string",
                    "description": "Text to search for - must match exactly and must only have one match exactly"
                },
                "new_str": {
                    "type": "string",
                    "description": "Text to replace old_str with"
                }
            },
            "required": ["path", "old_str", "new_str"]
        }),
        edit_file,
    )
}

/// Create the new_file tool definition
pub fn new_file_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "new_file",
        "Create a new file at the specified path with the given content. Overwrites if the file already exists.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path of the file to create"
                },
                "content": {
                    "type": "string",
                    "description": "The full content of the file"
                }
            },
            "required": ["path", "content"]
        }),
        new_file,
    )
}

/// Get all built-in tools, in the order they are advertised
pub fn builtin_tools() -> Vec<ToolDescriptor> {
    vec![
        read_file_tool(),
        list_files_tool(),
        edit_file_tool(),
        new_file_tool(),
    ]
}

fn read_file(ctx: &ToolContext, input: ReadFileInput) -> Result<ToolOutput, ToolError> {
    let contents = file_io::read_file(ctx.resolve(&input.path))?;
    Ok(ToolOutput::Text(contents))
}

fn list_files(ctx: &ToolContext, input: ListFilesInput) -> Result<ToolOutput, ToolError> {
    let dir = ctx.resolve(input.path.as_deref().unwrap_or("."));
    let entries = file_io::list_dir(dir)?;
    Ok(ToolOutput::Json(serde_json::json!(entries)))
}

fn edit_file(ctx: &ToolContext, input: EditFileInput) -> Result<ToolOutput, ToolError> {
    if input.path.is_empty() {
        return Err(ToolError::InvalidArgument("path must not be empty".to_string()));
    }
    if input.old_str == input.new_str {
        return Err(ToolError::InvalidArgument(
            "old_str and new_str must be different".to_string(),
        ));
    }

    let path = ctx.resolve(&input.path);
    if !path.exists() {
        if input.old_str.is_empty() {
            return new_file(
                ctx,
                NewFileInput {
                    path: input.path,
                    content: input.new_str,
                },
            );
        }
        return Err(ToolError::NotFound(path));
    }

    let contents = file_io::read_file(&path)?;
    if !contents.contains(&input.old_str) {
        return Err(ToolError::ContentNotFound(path));
    }

    // First occurrence only
    let new_contents = contents.replacen(&input.old_str, &input.new_str, 1);
    file_io::write_file(&path, new_contents)?;

    Ok(ToolOutput::Text(format!("Edited {} successfully.", input.path)))
}

fn new_file(ctx: &ToolContext, input: NewFileInput) -> Result<ToolOutput, ToolError> {
    if input.path.is_empty() {
        return Err(ToolError::InvalidArgument("path must not be empty".to_string()));
    }

    file_io::write_file(ctx.resolve(&input.path), &input.content)?;
    Ok(ToolOutput::Text(format!("Successfully created file {}", input.path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolInvocation, ToolRegistry};
    use serde_json::json;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn registry_in(temp_dir: &TempDir) -> ToolRegistry {
        ToolRegistry::builtin()
            .unwrap()
            .with_working_directory(temp_dir.path())
    }

    fn call(registry: &ToolRegistry, name: &str, arguments: serde_json::Value) -> crate::tools::ToolResult {
        registry.dispatch(&ToolInvocation::new("test_123", name, arguments))
    }

    #[test]
    fn test_builtin_tool_names() {
        let names: Vec<String> = builtin_tools().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["read_file", "list_files", "edit_file", "new_file"]);
    }

    #[test]
    fn test_edit_file_schema() {
        let schema = edit_file_tool().spec().input_schema;
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["old_str"].is_object());
        assert_eq!(schema["required"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_read_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("test.txt"), "Hello, World!").unwrap();

        let result = call(&registry_in(&temp_dir), "read_file", json!({"path": "test.txt"}));
        assert_eq!(result.invocation_id, "test_123");
        assert_eq!(result.content, "Hello, World!");
        assert!(!result.is_error);
    }

    #[test]
    fn test_read_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ToolContext::with_working_directory(temp_dir.path());

        let err = read_file(&ctx, ReadFileInput { path: "nonexistent.txt".to_string() }).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));

        let result = call(&registry_in(&temp_dir), "read_file", json!({"path": "nonexistent.txt"}));
        assert!(result.is_error);
        assert!(result.content.starts_with("Error executing tool read_file: File not found"));
    }

    #[test]
    fn test_list_files_one_level() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        std::fs::write(temp_dir.path().join("sub").join("deep.txt"), "deep").unwrap();

        let result = call(&registry_in(&temp_dir), "list_files", json!({}));
        assert!(!result.is_error);

        let entries: HashSet<String> = serde_json::from_str(&result.content).unwrap();
        let expected: HashSet<String> = ["a.txt", "sub/"].iter().map(|s| s.to_string()).collect();
        assert_eq!(entries, expected);
    }

    #[test]
    fn test_list_files_with_path() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        std::fs::write(temp_dir.path().join("sub").join("deep.txt"), "deep").unwrap();

        let result = call(&registry_in(&temp_dir), "list_files", json!({"path": "sub"}));
        assert_eq!(result.content, r#"["deep.txt"]"#);
    }

    #[test]
    fn test_new_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();

        let result = call(
            &registry_in(&temp_dir),
            "new_file",
            json!({"path": "subdir/nested/file.txt", "content": "Nested content"}),
        );
        assert!(!result.is_error);
        assert_eq!(result.content, "Successfully created file subdir/nested/file.txt");

        let contents = std::fs::read_to_string(temp_dir.path().join("subdir/nested/file.txt")).unwrap();
        assert_eq!(contents, "Nested content");
    }

    #[test]
    fn test_new_then_edit_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ToolContext::with_working_directory(temp_dir.path());
        let file_path = temp_dir.path().join("notes.txt");

        new_file(&ctx, NewFileInput { path: "notes.txt".to_string(), content: "A".to_string() }).unwrap();

        let edit = |old: &str, new: &str| {
            edit_file(
                &ctx,
                EditFileInput {
                    path: "notes.txt".to_string(),
                    old_str: old.to_string(),
                    new_str: new.to_string(),
                },
            )
        };

        let output = edit("A", "B").unwrap();
        assert_eq!(output, ToolOutput::Text("Edited notes.txt successfully.".to_string()));
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "B");

        assert!(matches!(edit("B", "B"), Err(ToolError::InvalidArgument(_))));
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "B");
    }

    #[test]
    fn test_edit_file_creates_missing_file_with_empty_old_str() {
        let temp_dir = TempDir::new().unwrap();

        let result = call(
            &registry_in(&temp_dir),
            "edit_file",
            json!({"path": "fresh.txt", "old_str": "", "new_str": "hello"}),
        );
        assert!(!result.is_error);
        assert_eq!(std::fs::read_to_string(temp_dir.path().join("fresh.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_edit_file_missing_file_with_old_str() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ToolContext::with_working_directory(temp_dir.path());

        let err = edit_file(
            &ctx,
            EditFileInput {
                path: "missing.txt".to_string(),
                old_str: "x".to_string(),
                new_str: "y".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert!(!temp_dir.path().join("missing.txt").exists());
    }

    #[test]
    fn test_edit_file_replaces_first_occurrence_only() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("repeat.txt");
        std::fs::write(&file_path, "one two one two").unwrap();

        let result = call(
            &registry_in(&temp_dir),
            "edit_file",
            json!({"path": "repeat.txt", "old_str": "one", "new_str": "three"}),
        );
        assert!(!result.is_error);
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "three two one two");
    }

    #[test]
    fn test_edit_file_content_not_found() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("edit_test.txt"), "Hello, World!").unwrap();
        let ctx = ToolContext::with_working_directory(temp_dir.path());

        let err = edit_file(
            &ctx,
            EditFileInput {
                path: "edit_test.txt".to_string(),
                old_str: "NotFound".to_string(),
                new_str: "Replacement".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::ContentNotFound(_)));
    }

    #[test]
    fn test_edit_file_empty_path() {
        let temp_dir = TempDir::new().unwrap();

        let result = call(
            &registry_in(&temp_dir),
            "edit_file",
            json!({"path": "", "old_str": "a", "new_str": "b"}),
        );
        assert!(result.is_error);
        assert_eq!(
            result.content,
            "Error executing tool edit_file: Invalid argument: path must not be empty"
        );
    }

    #[test]
    fn test_edit_file_missing_argument_is_validation_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = call(&registry_in(&temp_dir), "edit_file", json!({"path": "a.txt"}));
        assert!(result.is_error);
        assert!(result.content.starts_with("Invalid input for tool edit_file"));
    }
}
