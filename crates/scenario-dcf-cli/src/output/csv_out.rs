use serde_json::{Map, Value};
use std::io;

use super::{format_value, grids, lookup, ordered_outcomes};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

const SCENARIO_FIELDS: [(&str, &[&str]); 10] = [
    ("scenario", &["scenario", "key"]),
    ("name", &["scenario", "name"]),
    ("wacc", &["valuation", "wacc"]),
    ("terminal_growth", &["valuation", "terminal_growth"]),
    ("pv_fcf_total", &["valuation", "pv_fcf_total"]),
    ("pv_terminal_value", &["valuation", "pv_terminal_value"]),
    ("enterprise_value", &["valuation", "enterprise_value"]),
    ("equity_value", &["valuation", "equity_value"]),
    ("implied_share_price", &["valuation", "implied_share_price"]),
    ("upside_downside", &["valuation", "upside_downside"]),
];

/// Write output as CSV to stdout.
///
/// Valuation runs become one row per scenario, summaries one row per
/// summary line, and sensitivity grids one block per grid.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    // grid blocks have different widths than their headers
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) if result.contains_key("scenarios") => {
                write_scenarios(&mut wtr, result)
            }
            Some(Value::Object(result)) if !grids(result).is_empty() => {
                write_grids(&mut wtr, result)
            }
            Some(Value::Object(result)) => write_fields(&mut wtr, result),
            Some(Value::Array(rows)) => write_array_csv(&mut wtr, rows),
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_scenarios(wtr: &mut StdoutWriter<'_>, result: &Map<String, Value>) {
    let _ = wtr.write_record(SCENARIO_FIELDS.iter().map(|(name, _)| *name));
    for outcome in ordered_outcomes(result) {
        let row: Vec<String> = SCENARIO_FIELDS
            .iter()
            .map(|(_, path)| lookup(outcome, path).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}

fn write_grids(wtr: &mut StdoutWriter<'_>, result: &Map<String, Value>) {
    for (name, grid) in grids(result) {
        let mut header = vec![name.to_string()];
        if let Some(Value::Array(cols)) = grid.get("column_values") {
            header.extend(cols.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&header);

        if let (Some(Value::Array(rows)), Some(Value::Array(cells))) =
            (grid.get("row_values"), grid.get("cells"))
        {
            for (row, cells_row) in rows.iter().zip(cells) {
                let mut record = vec![format_csv_value(row)];
                if let Value::Array(cells_row) = cells_row {
                    record.extend(cells_row.iter().map(format_csv_value));
                }
                let _ = wtr.write_record(&record);
            }
        }
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
        other => format_value(other),
    }
}
