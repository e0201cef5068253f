use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_value, grids, lookup, ordered_outcomes};

const SCENARIO_COLUMNS: [(&str, &[&str]); 8] = [
    ("Scenario", &["scenario", "key"]),
    ("Name", &["scenario", "name"]),
    ("WACC", &["valuation", "wacc"]),
    ("Terminal g", &["valuation", "terminal_growth"]),
    ("Enterprise value", &["valuation", "enterprise_value"]),
    ("Equity value", &["valuation", "equity_value"]),
    ("Implied price", &["valuation", "implied_share_price"]),
    ("Upside", &["valuation", "upside_downside"]),
];

const WACC_FIELDS: [&str; 8] = [
    "wacc",
    "cost_of_equity",
    "cost_of_debt",
    "after_tax_cost_of_debt",
    "tax_rate",
    "weight_equity",
    "weight_debt",
    "beta",
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_envelope_notes(map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value) {
    match result {
        Value::Array(rows) => print_array_table(rows),
        Value::Object(map) if map.contains_key("scenarios") => print_model_run(map),
        Value::Object(map) if !grids(map).is_empty() => print_grids(map),
        Value::Object(map) => print_flat_object(map),
        other => println!("{}", format_value(other)),
    }
}

fn print_model_run(result: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Discount rate build-up", "Value"]);
    if let Some(Value::Object(wacc)) = result.get("wacc") {
        for field in WACC_FIELDS {
            if let Some(v) = wacc.get(field) {
                builder.push_record([field, &format_value(v)]);
            }
        }
    }
    for field in ["horizon", "terminal_growth"] {
        if let Some(v) = result.get(field) {
            builder.push_record([field, &format_value(v)]);
        }
    }
    println!("{}", Table::from(builder));

    let mut builder = Builder::default();
    builder.push_record(SCENARIO_COLUMNS.iter().map(|(title, _)| title.to_string()));
    for outcome in ordered_outcomes(result) {
        builder.push_record(SCENARIO_COLUMNS.iter().map(|(_, path)| {
            lookup(outcome, path).map(format_value).unwrap_or_default()
        }));
    }
    println!("\n{}", Table::from(builder));
}

fn print_grids(result: &Map<String, Value>) {
    for (name, grid) in grids(result) {
        let row_label = grid
            .get("row_variable")
            .map(format_value)
            .unwrap_or_default();
        let column_label = grid
            .get("column_variable")
            .map(format_value)
            .unwrap_or_default();

        let mut builder = Builder::default();
        let mut header = vec![format!("{row_label} \\ {column_label}")];
        if let Some(Value::Array(cols)) = grid.get("column_values") {
            header.extend(cols.iter().map(format_value));
        }
        builder.push_record(header);

        if let (Some(Value::Array(rows)), Some(Value::Array(cells))) =
            (grid.get("row_values"), grid.get("cells"))
        {
            for (row, cells_row) in rows.iter().zip(cells) {
                let mut record = vec![format_value(row)];
                if let Value::Array(cells_row) = cells_row {
                    record.extend(cells_row.iter().map(format_price));
                }
                builder.push_record(record);
            }
        }

        println!("{name}");
        println!("{}\n", Table::from(builder));
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Grid prices to two decimals; markers pass through.
fn format_price(cell: &Value) -> String {
    let text = format_value(cell);
    match text.parse::<Decimal>() {
        Ok(price) => price.round_dp(2).to_string(),
        Err(_) => text,
    }
}
