use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::models::NewWeightEntry;
use caltrack_core::service::CaltrackService;

use super::helpers::{
    exit_not_found, no_neg_zero, positive_days, print_json, resolve_logged_at,
};

const LBS_PER_KG: f64 = 2.20462;
const KG_PER_LB: f64 = 0.453_592;

fn to_kg(value: f64, unit: &str) -> Result<f64> {
    match unit.to_lowercase().as_str() {
        "kg" => Ok(value),
        "lbs" | "lb" => Ok(no_neg_zero(value * KG_PER_LB)),
        _ => bail!("Invalid unit '{unit}'. Use 'kg' or 'lbs'"),
    }
}

pub(crate) fn cmd_weight_log(
    svc: &CaltrackService,
    value: f64,
    unit: &str,
    date: Option<String>,
    time: Option<&str>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let weight_kg = to_kg(value, unit)?;
    if !unit.eq_ignore_ascii_case("kg") {
        eprintln!("Converting {value:.1} lbs -> {weight_kg:.2} kg");
    }

    let logged_at = resolve_logged_at(date, time)?;
    let entry = svc.log_weight(&NewWeightEntry {
        weight_kg,
        logged_at,
        note,
    })?;

    if json {
        print_json(&entry)?;
    } else {
        println!(
            "Logged {:.1} kg ({:.1} lbs) for {} (id {})",
            entry.weight_kg,
            entry.weight_kg * LBS_PER_KG,
            entry.date,
            entry.id
        );
        if let Some(ref n) = entry.note {
            println!("  Note: {n}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_weight_history(
    svc: &CaltrackService,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    let days = days.map(positive_days).transpose()?;
    let entries = svc.weight_history_or_empty(days);

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        exit_not_found(
            "No weight entries found. Use `caltrack weight log` to record your weight.",
            false,
        );
    }

    #[derive(Tabled)]
    struct WeightRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        kg: String,
        #[tabled(rename = "Weight (lbs)")]
        lbs: String,
        #[tabled(rename = "Change")]
        change: String,
        #[tabled(rename = "Note")]
        note: String,
    }

    // Entries are newest first; change is relative to the next-older entry.
    let rows: Vec<WeightRow> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| WeightRow {
            id: e.id,
            date: e.date.clone(),
            kg: format!("{:.1}", e.weight_kg),
            lbs: format!("{:.1}", e.weight_kg * LBS_PER_KG),
            change: entries.get(i + 1).map_or_else(String::new, |older| {
                format!("{:+.1}", no_neg_zero(e.weight_kg - older.weight_kg))
            }),
            note: e.note.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_weight_delete(svc: &CaltrackService, id: i64, json: bool) -> Result<()> {
    svc.delete_weight(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted weight entry {id}");
    }
    Ok(())
}
