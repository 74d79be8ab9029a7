pub mod catalog;
pub mod error;
pub mod prompts;
pub mod response_parser;
pub mod session;
pub mod tool_definitions;
pub mod tools;
pub mod ui_writer;
pub mod utils;

pub use catalog::{ParamKind, Tool, ToolCatalog, ToolHandler, ToolParam};
pub use error::{CatalogError, SessionError};
pub use response_parser::{parse, ParsedResponse, ToolInvocation};
pub use session::{Flow, Session, SessionOptions, SessionState};
pub use tools::{ToolArgs, ToolContext, ToolOutput, ToolSettings};
pub use ui_writer::{NullUiWriter, ScriptedUiWriter, UiEvent, UiWriter};
