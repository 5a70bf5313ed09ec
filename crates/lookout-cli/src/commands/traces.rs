//! Traces commands

use serde_json::{json, Value};

use super::{cell_text, print_json, print_table, raw_rows, scalar_table, McpClient};
use crate::{OutputFormat, TracesCommands};

pub async fn handle(client: &McpClient, command: TracesCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        TracesCommands::Search {
            time_range,
            service,
            operation,
            errors,
            limit,
        } => {
            let params = json!({
                "timeRange": time_range,
                "service": service,
                "operation": operation,
                "error": errors.then_some("true"),
                "limit": limit,
            });

            let data = client.call_tool("search_traces", params).await?;
            print_spans(&data, format)?;
        }

        TracesCommands::Aggregate {
            aggregation,
            aggregate_on,
            group_by,
            order_by,
            time_range,
            service,
            limit,
        } => {
            let params = json!({
                "aggregation": aggregation,
                "aggregateOn": aggregate_on,
                "groupBy": group_by,
                "orderBy": order_by,
                "timeRange": time_range,
                "service": service,
                "limit": limit,
            });

            let data = client.call_tool("aggregate_traces", params).await?;
            match (format, scalar_table(&data["result"])) {
                (OutputFormat::Table, Some((columns, rows))) => print_table(&columns, &rows),
                _ => print_json(&data, format)?,
            }
        }
    }

    Ok(())
}

fn print_spans(data: &Value, format: OutputFormat) -> anyhow::Result<()> {
    let rows = raw_rows(&data["result"]);

    match format {
        OutputFormat::Json => print_json(data, format)?,
        OutputFormat::Compact => {
            for row in rows {
                let span = &row["data"];
                println!(
                    "{} {} {} {}ns",
                    cell_text(&span["trace_id"]),
                    cell_text(&span["service.name"]),
                    cell_text(&span["name"]),
                    cell_text(&span["duration_nano"])
                );
            }
        }
        OutputFormat::Table => {
            let table: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    let span = &row["data"];
                    vec![
                        cell_text(&row["timestamp"]),
                        cell_text(&span["trace_id"]),
                        cell_text(&span["service.name"]),
                        cell_text(&span["name"]),
                        cell_text(&span["duration_nano"]),
                        cell_text(&span["has_error"]),
                    ]
                })
                .collect();
            print_table(
                &["TIMESTAMP", "TRACE", "SERVICE", "OPERATION", "DURATION_NS", "ERROR"].map(str::to_string),
                &table,
            );
        }
    }

    Ok(())
}
