use serde_json::{Map, Value};

use super::{format_value, lookup, ordered_outcomes};

/// Print just the headline numbers.
///
/// Valuation runs and summaries print one `key: implied price` line per
/// scenario, scenario listings print their keys, and other results print
/// the first well-known field present.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Object(map) if map.contains_key("scenarios") => {
            for outcome in ordered_outcomes(map) {
                print_price_line(
                    lookup(outcome, &["scenario", "key"]),
                    lookup(outcome, &["valuation", "implied_share_price"]),
                );
            }
        }
        Value::Array(rows) if rows.iter().all(|r| r.get("implied_share_price").is_some()) => {
            for row in rows {
                print_price_line(row.get("key"), row.get("implied_share_price"));
            }
        }
        Value::Object(map) => print_priority_field(map),
        Value::Array(rows) => {
            for row in rows {
                match row.get("key") {
                    Some(key) => println!("{}", format_value(key)),
                    None => println!("{}", format_value(row)),
                }
            }
        }
        other => println!("{}", format_value(other)),
    }
}

fn print_priority_field(map: &Map<String, Value>) {
    let priority_keys = [
        "base_implied_share_price",
        "implied_share_price",
        "wacc",
        "enterprise_value",
        "equity_value",
    ];

    for key in &priority_keys {
        if let Some(val) = map.get(*key) {
            if !val.is_null() {
                println!("{}", format_value(val));
                return;
            }
        }
    }

    if let Some((key, val)) = map.iter().next() {
        println!("{}: {}", key, format_value(val));
    }
}

fn print_price_line(key: Option<&Value>, price: Option<&Value>) {
    println!(
        "{}: {}",
        key.map(format_value).unwrap_or_default(),
        price.map(format_value).unwrap_or_default()
    );
}
