use anyhow::Result;
use chrono::Local;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::service::CaltrackService;

use super::helpers::{exit_not_found, no_neg_zero, parse_date, positive_days, print_json};
use super::meal::print_meal_line;

pub(crate) fn cmd_summary(svc: &CaltrackService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let summary = svc.daily_summary(date)?;

    if json {
        return print_json(&summary);
    }

    if summary.meals.is_empty() && summary.water_ml <= 0.0 {
        exit_not_found(&format!("No entries for {}", summary.date), false);
    }

    println!("=== {} ===\n", summary.date);

    for group in &summary.meals {
        let label = group.meal_type.as_str().to_uppercase();
        println!("  {label} ({:.0} kcal)", group.subtotal_calories);
        for meal in &group.meals {
            print_meal_line(meal);
        }
        println!();
    }

    let total_cal = summary.total_calories;
    let total_p = summary.total_protein_g;
    let total_c = summary.total_carbs_g;
    let total_f = summary.total_fat_g;
    println!("  TOTAL: {total_cal:.0} kcal | P:{total_p:.0}g C:{total_c:.0}g F:{total_f:.0}g");

    if let Some(target) = &summary.target {
        let (tcal, pg, cg, fg) = (target.calories, target.protein_g, target.carbs_g, target.fat_g);
        println!("  TARGET: {tcal:.0} kcal | P:{pg:.0}g C:{cg:.0}g F:{fg:.0}g");
        let rcal = summary.remaining_calories.unwrap_or(tcal - total_cal);
        let (rp, rc, rf) = (pg - total_p, cg - total_c, fg - total_f);
        println!("  REMAINING: {rcal:.0} kcal | P:{rp:.0}g C:{rc:.0}g F:{rf:.0}g");
    }

    println!(
        "  WATER: {:.0} / {:.0} ml",
        summary.water_ml, summary.water_goal_ml
    );

    Ok(())
}

pub(crate) fn cmd_history(svc: &CaltrackService, days: u32, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Meals")]
        meals: i64,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let days = positive_days(days)?;
    let today = Local::now().date_naive();
    let report = svc.history(today, days)?;

    if json {
        return print_json(&report);
    }

    if report.days.iter().all(|d| d.meal_count == 0) {
        exit_not_found(&format!("No entries in the last {days} days"), false);
    }

    // Newest first, like the summary listing.
    let rows: Vec<HistoryRow> = report
        .days
        .iter()
        .rev()
        .map(|d| HistoryRow {
            date: d.date.clone(),
            meals: d.meal_count,
            calories: format!("{:.0}", no_neg_zero(d.calories)),
            protein: format!("{:.0}g", no_neg_zero(d.protein_g)),
            carbs: format!("{:.0}g", no_neg_zero(d.carbs_g)),
            fat: format!("{:.0}g", no_neg_zero(d.fat_g)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    println!(
        "Average: {:.0} kcal/day over logged days | Streak: {} day(s)",
        report.average_calories, report.logging_streak
    );
    if let Some(target) = report.target_calories {
        println!("Target: {target:.0} kcal/day");
    }

    Ok(())
}
