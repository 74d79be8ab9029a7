//! Tool definitions for the agent's available tools.
//!
//! Each definition pairs the schema shown to the model with the handler in
//! `crate::tools` that implements it.

use crate::catalog::{ParamKind, Tool, ToolParam};
use crate::tools::{file_ops, process, shell, web};

/// Every built-in tool, in the order they are described to the model.
pub fn default_tools() -> Vec<Tool> {
    let mut tools = create_file_tools();
    tools.extend(create_process_tools());
    tools.extend(create_web_tools());
    tools
}

fn create_file_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "read_file",
            "Reads the entire content of a specified file. Use this when the user asks to open, read, summarize, or view a file.",
            file_ops::execute_read_file,
        )
        .param(ToolParam::required(
            "file_path",
            ParamKind::String,
            "The absolute or relative path to the file.",
        ))
        .with_working_directory(),
        Tool::new(
            "write_file",
            "Writes content to a specified file. Creates the file and any necessary directories if they don't exist.",
            file_ops::execute_write_file,
        )
        .param(ToolParam::required(
            "file_path",
            ParamKind::String,
            "The absolute or relative path to the file.",
        ))
        .param(ToolParam::required(
            "content",
            ParamKind::String,
            "The content to write to the file.",
        ))
        .with_working_directory(),
        Tool::new(
            "create_file",
            "Creates a new file at a specified path, optionally with initial content. Fails if the file exists.",
            file_ops::execute_create_file,
        )
        .param(ToolParam::required(
            "file_path",
            ParamKind::String,
            "The path for the new file.",
        ))
        .param(ToolParam::optional(
            "content",
            ParamKind::String,
            "",
            "Optional initial content for the file.",
        ))
        .with_working_directory(),
        Tool::new(
            "replace_file_content",
            "Edits an existing file by completely replacing its content.",
            file_ops::execute_replace_file_content,
        )
        .param(ToolParam::required(
            "file_path",
            ParamKind::String,
            "The path to the file to be modified.",
        ))
        .param(ToolParam::required(
            "new_content",
            ParamKind::String,
            "The new content to write to the file.",
        ))
        .with_working_directory(),
        Tool::new(
            "list_dir",
            "Lists all files and subdirectories within a specified directory.",
            file_ops::execute_list_dir,
        )
        .param(ToolParam::optional(
            "directory_path",
            ParamKind::String,
            ".",
            "The path to the directory to list. Defaults to current.",
        ))
        .with_working_directory(),
        Tool::new(
            "find_by_name",
            "Searches for files or directories by their exact name within a given directory.",
            file_ops::execute_find_by_name,
        )
        .param(ToolParam::required(
            "name",
            ParamKind::String,
            "The file or directory name to search for.",
        ))
        .param(ToolParam::optional(
            "search_dir",
            ParamKind::String,
            ".",
            "The directory to start the search from. Defaults to current.",
        ))
        .with_working_directory(),
        Tool::new(
            "grep_search",
            "Searches for a specific text pattern within files in a directory.",
            file_ops::execute_grep_search,
        )
        .param(ToolParam::required(
            "pattern",
            ParamKind::String,
            "The text pattern to search for.",
        ))
        .param(ToolParam::optional(
            "search_dir",
            ParamKind::String,
            ".",
            "The directory to search within. Defaults to current.",
        ))
        .with_working_directory(),
        Tool::new(
            "change_directory",
            "Changes the current working directory for subsequent commands and file operations.",
            file_ops::execute_change_directory,
        )
        .param(ToolParam::required(
            "path",
            ParamKind::String,
            "The directory to change to.",
        ))
        .with_working_directory(),
    ]
}

fn create_process_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "execute_command",
            "Executes a shell command in the current working directory and returns its output once it finishes.",
            shell::execute_command,
        )
        .param(ToolParam::required(
            "command",
            ParamKind::String,
            "The shell command to execute.",
        ))
        .with_working_directory(),
        Tool::new(
            "start_process",
            "Starts a command in the background and returns its initial output and PID after a 2-second wait.",
            process::execute_start_process,
        )
        .param(ToolParam::required(
            "command",
            ParamKind::String,
            "The command to execute.",
        ))
        .with_working_directory(),
        Tool::new(
            "read_process_output",
            "Returns the output a background process has produced since it was last read.",
            process::execute_read_process_output,
        )
        .param(ToolParam::required(
            "pid",
            ParamKind::Integer,
            "The PID of the background process.",
        ))
        .param(ToolParam::optional(
            "wait_seconds",
            ParamKind::Integer,
            "0",
            "Seconds to wait before reading. Defaults to 0.",
        )),
        Tool::new(
            "stop_process",
            "Stops a background process that was started by Alexia.",
            process::execute_stop_process,
        )
        .param(ToolParam::required(
            "pid",
            ParamKind::Integer,
            "The PID of the process to stop.",
        )),
        Tool::new(
            "list_processes",
            "Lists all running processes on the system with CPU and memory usage, marking the ones started by Alexia as managed.",
            process::execute_list_processes,
        ),
    ]
}

fn create_web_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "read_url_content",
            "Reads the primary textual content from a given URL.",
            web::execute_read_url_content,
        )
        .param(ToolParam::required(
            "url",
            ParamKind::String,
            "The URL to read content from.",
        )),
        Tool::new(
            "open_browser_url",
            "Opens a specified URL in the user's default web browser.",
            web::execute_open_browser_url,
        )
        .param(ToolParam::required("url", ParamKind::String, "The URL to open.")),
    ]
}
