use serde_json::Value;
use std::io;
use tabled::{builder::Builder, Table};

use crate::OutputFormat;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => print_table(value),
        OutputFormat::Csv => print_csv(value),
        OutputFormat::Minimal => print_minimal(value),
    }
}

/// Pretty-print JSON to stdout.
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

fn print_table(value: &Value) {
    let Some(map) = value.as_object() else {
        println!("{}", value);
        return;
    };

    match map.get("result") {
        Some(Value::Object(result)) => {
            // A cash flow projection carries a per-year array worth its
            // own table; everything else is flat field/value rows
            if let Some(Value::Array(years)) = result.get("years") {
                print_row_table(years);
                let mut footer = Builder::default();
                footer.push_record(["Field", "Value"]);
                for (key, val) in result.iter().filter(|(k, _)| *k != "years") {
                    footer.push_record([key.as_str(), &format_value(val)]);
                }
                println!("{}", Table::from(footer));
            } else {
                print_field_table(result);
            }
            print_envelope_footer(map);
        }
        _ => {
            if let Value::Object(m) = value {
                print_field_table(m);
            }
        }
    }
}

fn print_field_table(map: &serde_json::Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

/// Table from an array of uniform objects, one row per element.
fn print_row_table(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        println!("(empty)");
        return;
    };
    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in rows {
        if let Value::Object(map) = row {
            let record: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(record);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_envelope_footer(envelope: &serde_json::Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {}", methodology);
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        nested => serde_json::to_string(nested).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                if let Some(Value::Array(years)) = result.get("years") {
                    write_array_csv(&mut wtr, years);
                } else {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in result {
                        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                    }
                }
            }
            _ => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        },
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(|v| format_csv_value(v)).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        nested => serde_json::to_string(nested).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Minimal
// ---------------------------------------------------------------------------

/// Print just the headline figure from the output.
///
/// Heuristic: well-known result fields in priority order, then the
/// first field of the result object.
fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "cap_rate",
        "annual_cash_flow",
        "cumulative_cash_flow",
        "risk_rating",
        "probability_of_loss",
        "dscr",
        "roi",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            // Simulation output nests the headline under the risk profile
            let val = map.get(*key).or_else(|| {
                map.get("terminal_cash_flow").and_then(|p| p.get(*key))
            });
            if let Some(val) = val {
                if !val.is_null() {
                    println!("{}", format_value(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_value(val));
            return;
        }
    }

    println!("{}", format_value(result_obj));
}
