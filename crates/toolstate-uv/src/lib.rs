mod client;
mod command;
mod layout;
mod list;
mod options;

pub use client::{resolve_venv_python, UvClient};
pub use command::{CommandOutput, CommandRunner, SystemRunner, UvInvocation};
pub use layout::{ToolLayout, SYSTEM_TOOL_BIN_DIR, SYSTEM_TOOL_DIR};
pub use list::{
    parse_pip_list_json, parse_python_version, parse_tool_list_line, parse_tool_list_output,
    ToolListEntry,
};
pub use options::{PythonPreference, UvOptions};
