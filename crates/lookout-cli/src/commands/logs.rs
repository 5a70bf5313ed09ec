//! Logs commands

use serde_json::{json, Value};

use super::{cell_text, print_json, print_table, raw_rows, scalar_table, truncate, McpClient};
use crate::{LogsCommands, OutputFormat};

pub async fn handle(client: &McpClient, command: LogsCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        LogsCommands::Search {
            text,
            time_range,
            severity,
            service,
            filter,
            limit,
        } => {
            let params = json!({
                "searchText": text,
                "timeRange": time_range,
                "severity": severity,
                "service": service,
                "filter": filter,
                "limit": limit,
            });

            let data = client.call_tool("search_logs", params).await?;
            print_logs(&data, format)?;
        }

        LogsCommands::Errors { time_range, limit } => {
            let params = json!({
                "aggregation": "count",
                "severity": "ERROR",
                "groupBy": "service.name",
                "timeRange": time_range,
                "limit": limit,
            });

            let data = client.call_tool("aggregate_logs", params).await?;
            match (format, scalar_table(&data["result"])) {
                (OutputFormat::Table, Some((columns, rows))) => {
                    println!("Error logs per service (last {time_range}):\n");
                    print_table(&columns, &rows);
                }
                _ => print_json(&data, format)?,
            }
        }
    }

    Ok(())
}

fn print_logs(data: &Value, format: OutputFormat) -> anyhow::Result<()> {
    let rows = raw_rows(&data["result"]);

    match format {
        OutputFormat::Json => print_json(data, format)?,
        OutputFormat::Compact => {
            for row in rows {
                let log = &row["data"];
                println!(
                    "{} [{}] {}",
                    cell_text(&row["timestamp"]),
                    log.get("severity_text").and_then(Value::as_str).unwrap_or("-"),
                    log.get("body").and_then(Value::as_str).unwrap_or("")
                );
            }
        }
        OutputFormat::Table => {
            let table: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    let log = &row["data"];
                    vec![
                        cell_text(&row["timestamp"]),
                        cell_text(&log["severity_text"]),
                        cell_text(&log["service.name"]),
                        truncate(log.get("body").and_then(Value::as_str).unwrap_or(""), 60),
                    ]
                })
                .collect();
            print_table(
                &["TIMESTAMP", "SEVERITY", "SERVICE", "MESSAGE"].map(str::to_string),
                &table,
            );
        }
    }

    Ok(())
}
