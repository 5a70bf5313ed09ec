//! Status command

use serde_json::{json, Value};

use super::{print_json, McpClient};
use crate::OutputFormat;

pub async fn handle(client: &McpClient, format: OutputFormat) -> anyhow::Result<()> {
    let (status, health) = client.get("/health").await?;
    let (_, tools) = client.get("/tools").await?;
    let tool_count = tools.get("tools").and_then(Value::as_array).map_or(0, Vec::len);

    match format {
        OutputFormat::Table => {
            println!("Lookout Status");
            println!("==============\n");

            let backend = health.get("status").and_then(Value::as_str).unwrap_or("unknown");
            println!("Server:  {} ({})", client.server_url(), status);
            println!("Backend: {backend}");
            println!("Tools:   {tool_count}");
        }
        _ => {
            let summary = json!({
                "server": client.server_url(),
                "httpStatus": status.as_u16(),
                "backend": health,
                "tools": tool_count,
            });
            print_json(&summary, format)?;
        }
    }

    Ok(())
}
