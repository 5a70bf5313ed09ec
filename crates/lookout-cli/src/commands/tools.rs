//! Tool listing and direct tool calls

use serde_json::Value;

use super::{parse_params, print_json, print_table, truncate, McpClient};
use crate::OutputFormat;

pub async fn list(client: &McpClient, format: OutputFormat) -> anyhow::Result<()> {
    let (_, resp) = client.get("/tools").await?;

    match format {
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = resp
                .get("tools")
                .and_then(Value::as_array)
                .map(|tools| {
                    tools
                        .iter()
                        .map(|t| {
                            let name = t.get("name").and_then(Value::as_str).unwrap_or("");
                            let description = t.get("description").and_then(Value::as_str).unwrap_or("");
                            vec![name.to_string(), truncate(description, 70)]
                        })
                        .collect()
                })
                .unwrap_or_default();
            print_table(&["TOOL".to_string(), "DESCRIPTION".to_string()], &rows);
        }
        _ => print_json(&resp, format)?,
    }

    Ok(())
}

pub async fn call(client: &McpClient, tool: &str, params: &[String], format: OutputFormat) -> anyhow::Result<()> {
    let params = parse_params(params)?;
    let data = client.call_tool(tool, params).await?;
    print_json(&data, format)
}
