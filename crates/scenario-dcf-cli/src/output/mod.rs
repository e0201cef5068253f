pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

/// Scenario outcomes of a valuation run, in registration order.
pub(crate) fn ordered_outcomes(result: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    let Some(Value::Object(scenarios)) = result.get("scenarios") else {
        return Vec::new();
    };
    match result.get("scenario_order") {
        Some(Value::Array(order)) => order
            .iter()
            .filter_map(|k| k.as_str())
            .filter_map(|k| scenarios.get(k))
            .filter_map(Value::as_object)
            .collect(),
        _ => scenarios.values().filter_map(Value::as_object).collect(),
    }
}

/// Sensitivity grids contained in a result object, by field name.
pub(crate) fn grids(result: &Map<String, Value>) -> Vec<(&str, &Map<String, Value>)> {
    result
        .iter()
        .filter_map(|(name, v)| v.as_object().map(|grid| (name.as_str(), grid)))
        .filter(|(_, grid)| grid.contains_key("cells") && grid.contains_key("row_values"))
        .collect()
}

/// Field lookup through nested objects, e.g. `["valuation", "wacc"]`.
pub(crate) fn lookup<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(map.get(*first)?, |v, key| v.as_object()?.get(*key))
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
