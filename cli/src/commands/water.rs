use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::models::NewWaterEntry;
use caltrack_core::service::CaltrackService;

use super::helpers::{exit_not_found, parse_date, print_json, resolve_logged_at, time_of_day};

pub(crate) fn cmd_water_add(
    svc: &CaltrackService,
    amount_ml: f64,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let logged_at = resolve_logged_at(date, time)?;
    let entry = svc.log_water(&NewWaterEntry {
        amount_ml,
        logged_at,
    })?;

    if json {
        print_json(&entry)?;
    } else {
        let date = logged_at.date_naive();
        let total = svc.water_total(date)?;
        let goal = svc.water_goal()?;
        println!(
            "Logged {:.0} ml (id {}). {date}: {total:.0} / {goal:.0} ml",
            entry.amount_ml, entry.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_water_today(
    svc: &CaltrackService,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct WaterRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Amount (ml)")]
        amount: String,
    }

    let date = parse_date(date)?;
    let entries = svc.water_for_date_or_empty(date);
    let total: f64 = entries.iter().map(|e| e.amount_ml).sum();
    let goal = svc.water_goal()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "date": date.format("%Y-%m-%d").to_string(),
                "entries": entries,
                "total_ml": total,
                "goal_ml": goal,
            }))?
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("No water logged for {date}. Goal: {goal:.0} ml");
        return Ok(());
    }

    let rows: Vec<WaterRow> = entries
        .iter()
        .map(|e| WaterRow {
            id: e.id,
            time: time_of_day(&e.logged_at),
            amount: format!("{:.0}", e.amount_ml),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let percent = (total / goal * 100.0).round() as i64;
    println!("Total: {total:.0} / {goal:.0} ml ({percent}%)");
    Ok(())
}

pub(crate) fn cmd_water_delete(svc: &CaltrackService, id: i64, json: bool) -> Result<()> {
    if !svc.delete_water(id)? {
        exit_not_found(&format!("Water entry {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted water entry {id}");
    }
    Ok(())
}

pub(crate) fn cmd_water_goal(svc: &CaltrackService, ml: Option<f64>, json: bool) -> Result<()> {
    if let Some(ml) = ml {
        svc.set_water_goal(ml)?;
    }
    let goal = svc.water_goal()?;
    if json {
        println!("{}", serde_json::json!({ "goal_ml": goal }));
    } else if ml.is_some() {
        println!("Daily water goal set to {goal:.0} ml");
    } else {
        println!("Daily water goal: {goal:.0} ml");
    }
    Ok(())
}
