use serde::Serialize;
use serde_json::{json, Value};
use std::io::Read;

use crate::cli::OutputFormat;
use crate::notify::{Level, Notification};

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(extra)) = data {
                if let Some(obj) = response.as_object_mut() {
                    obj.extend(extra);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output one page of records plus pager details
pub fn output_page<T: Serialize>(
    output_format: &OutputFormat,
    collection_name: &str,
    records: &[T],
    page_index: usize,
    page_count: usize,
    total: usize,
    render_row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: records,
                "page": page_index,
                "pages": page_count,
                "total": total
            }))?);
        }
        OutputFormat::Text => {
            for record in records {
                println!("{}", render_row(record));
            }
            println!("{}", "-".repeat(60));
            println!("Page {} of {} ({} matching)", page_index + 1, page_count, total);
        }
    }
    Ok(())
}

/// Echo notifications to stderr so stdout stays parseable in JSON mode
pub fn print_notifications(notifications: &[Notification]) {
    for n in notifications {
        let marker = match n.level {
            Level::Success => "✓",
            Level::Info => "•",
            Level::Error => "✗",
        };
        eprintln!("{} {}", marker, n.message);
    }
}

/// Read a JSON object from stdin
pub fn read_json_stdin() -> anyhow::Result<Value> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let value: Value = serde_json::from_str(&input)
        .map_err(|e| anyhow::anyhow!("stdin is not valid JSON: {}", e))?;
    if !value.is_object() {
        anyhow::bail!("expected a JSON object on stdin");
    }
    Ok(value)
}
