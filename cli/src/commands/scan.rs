use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::analyzer::{DetectedObject, FoodAnalyzer, LabelClassifier};
use caltrack_core::service::CaltrackService;

use super::helpers::{exit_not_found, print_json};

/// Analyze classifier detections given as `label:confidence` pairs.
pub(crate) fn cmd_scan(
    svc: CaltrackService,
    labels: &[String],
    threshold: Option<f64>,
    json: bool,
) -> Result<()> {
    if labels.is_empty() {
        bail!("Provide at least one detection as LABEL:CONFIDENCE (e.g. banana:0.9)");
    }
    let objects = labels
        .iter()
        .map(|l| l.parse::<DetectedObject>())
        .collect::<Result<Vec<_>>>()?;

    let svc = match threshold {
        Some(t) if (0.0..=1.0).contains(&t) => {
            svc.with_analyzer(FoodAnalyzer::new().with_threshold(t))
        }
        Some(t) => bail!("Threshold must be between 0 and 1, got {t}"),
        None => svc,
    };

    let classifier = LabelClassifier::new(objects);
    let suggestions = svc.analyze_and_record(&classifier, &[])?;

    if suggestions.is_empty() {
        exit_not_found("No food recognised", json);
    }
    if json {
        return print_json(&suggestions);
    }

    #[derive(Tabled)]
    struct SuggestionRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Confidence")]
        confidence: String,
        #[tabled(rename = "Cal/serving")]
        calories: String,
    }

    let rows: Vec<SuggestionRow> = suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| SuggestionRow {
            idx: i + 1,
            name: s.name.clone(),
            category: s.category.clone(),
            confidence: format!("{:.0}%", s.confidence * 100.0),
            calories: s.nutrition.map_or_else(
                || "-".to_string(),
                |n| {
                    let serving = n.default_serving();
                    format!("{:.0} ({:.0}g)", serving.calories, serving.grams)
                },
            ),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("Saved '{}' to scan history", suggestions[0].name);
    Ok(())
}

pub(crate) fn cmd_scan_history(svc: &CaltrackService, limit: i64, json: bool) -> Result<()> {
    let scans = svc.recent_scans_or_empty(limit);
    if json {
        return print_json(&scans);
    }
    if scans.is_empty() {
        exit_not_found("No scans recorded", false);
    }

    #[derive(Tabled)]
    struct ScanRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Scanned")]
        scanned_at: String,
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Confidence")]
        confidence: String,
    }

    let rows: Vec<ScanRow> = scans
        .iter()
        .map(|s| ScanRow {
            id: s.id,
            scanned_at: s.scanned_at.chars().take(16).collect::<String>().replace('T', " "),
            food: s.food_name.clone(),
            category: s.category.clone(),
            confidence: format!("{:.0}%", s.confidence * 100.0),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_scan_clear(svc: &CaltrackService, json: bool) -> Result<()> {
    let removed = svc.clear_scan_history()?;
    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!("Cleared {removed} scan(s)");
    }
    Ok(())
}
