use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use caltrack_core::models::ExportData;
use caltrack_core::service::CaltrackService;

use super::helpers::exit_not_found;

/// Write the full JSON backup, or only meals as CSV, to `output` or stdout.
pub(crate) fn cmd_export(svc: &CaltrackService, output: Option<&Path>, csv: bool) -> Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create file: {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    if csv {
        let count = svc.write_meals_csv(writer)?;
        if let Some(path) = output {
            eprintln!("Exported {count} meals to {}", path.display());
        }
        return Ok(());
    }

    let data = svc.export_all()?;
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, &data)?;
    writeln!(writer)?;
    writer.flush()?;
    if let Some(path) = output {
        eprintln!(
            "Exported {} meals, {} water entries, {} weight entries, {} custom foods, {} scans to {}",
            data.meals.len(),
            data.water_entries.len(),
            data.weight_entries.len(),
            data.custom_foods.len(),
            data.scans.len(),
            path.display()
        );
    }
    Ok(())
}

pub(crate) fn cmd_import(svc: &CaltrackService, path: &Path, json: bool) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let data: ExportData = serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("{} is not a caltrack export", path.display()))?;

    let summary = svc.import_all(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Import complete.\n");
        println!("  Meals:          {}", summary.meals_imported);
        println!("  Water entries:  {}", summary.water_entries_imported);
        println!("  Weight entries: {}", summary.weight_entries_imported);
        println!("  Custom foods:   {}", summary.custom_foods_imported);
        println!("  Scans:          {}", summary.scans_imported);
        println!(
            "  Profile:        {}",
            if summary.profile_imported { "restored" } else { "-" }
        );
        if summary.records_skipped > 0 {
            println!("  Skipped:        {} invalid records", summary.records_skipped);
        }
    }
    Ok(())
}

pub(crate) fn cmd_import_mfp(
    svc: &CaltrackService,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let csv_data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let summary = svc.import_mfp_csv(&csv_data, dry_run)?;

    if summary.rows_parsed == 0 {
        exit_not_found("No rows found in CSV file", json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if dry_run {
        println!("Dry run, no changes made.\n");
    } else {
        println!("Import complete.\n");
    }
    println!("  Rows parsed:     {}", summary.rows_parsed);
    println!(
        "  Meals {}:  {}",
        if dry_run { "to log" } else { "logged" },
        summary.meals_logged
    );
    println!("  Rows skipped:    {}", summary.rows_skipped);
    println!("  Filed as snack:  {}", summary.mapped_to_snack);
    println!("  Dates spanned:   {}", summary.dates_spanned);
    Ok(())
}
