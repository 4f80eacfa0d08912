// MCP (Model Context Protocol) server exposing Claude on AWS Bedrock
// as a single tool to agent clients (IDE assistants, desktop chat clients)

pub mod logging;
pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
