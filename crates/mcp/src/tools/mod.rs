pub mod invoke_claude;
mod registry;

pub use invoke_claude::InvokeClaudeTool;
pub use registry::{
    json_schema_enum, json_schema_number, json_schema_object, json_schema_string, Tool,
    ToolRegistry,
};
