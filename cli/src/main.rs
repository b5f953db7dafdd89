mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    FoodArgs, MealArgs, MealEdit, ProfileArgs, cmd_export, cmd_food_add, cmd_food_delete,
    cmd_food_favorite, cmd_food_list, cmd_food_log, cmd_food_search, cmd_history, cmd_import,
    cmd_import_mfp, cmd_meal_copy, cmd_meal_delete, cmd_meal_list, cmd_meal_log, cmd_meal_update,
    cmd_nutrition_categories, cmd_nutrition_log, cmd_nutrition_lookup, cmd_nutrition_search,
    cmd_profile_clear, cmd_profile_set, cmd_profile_show, cmd_scan, cmd_scan_clear,
    cmd_scan_history, cmd_summary, cmd_water_add, cmd_water_delete, cmd_water_goal,
    cmd_water_today, cmd_weight_delete, cmd_weight_history, cmd_weight_log,
};
use crate::config::Config;
use caltrack_core::service::CaltrackService;

#[derive(Parser)]
#[command(
    name = "caltrack",
    version,
    about = "Track calories, water and weight from the terminal",
    long_about = "Track calories, water and weight from the terminal.\n\n\
        Data lives in a local SQLite database. Set CALTRACK_DB to use a different file \
        and CALTRACK_LOG (e.g. debug) to see diagnostic logs on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log, list and edit meals
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Show daily summary (defaults to today)
    Summary {
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show calorie totals for the last N days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Track water intake
    Water {
        #[command(subcommand)]
        command: WaterCommands,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Manage your health profile and derived calorie targets
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Manage custom foods
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Look up foods in the built-in nutrition table
    Nutrition {
        #[command(subcommand)]
        command: NutritionCommands,
    },
    /// Suggest foods from image classifier labels
    Scan(ScanArgs),
    /// Export all data as JSON (or meals as CSV)
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Export meals only, as CSV
        #[arg(long)]
        csv: bool,
    },
    /// Import a JSON export, skipping records that already exist
    Import {
        /// Path to the export file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import meals from a `MyFitnessPal` CSV export
    ImportMfp {
        /// Path to the MFP CSV file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Log a meal
    Log {
        /// Meal name
        name: String,
        /// Calories
        #[arg(short, long)]
        calories: f64,
        /// Protein in grams
        #[arg(short, long, default_value = "0")]
        protein: f64,
        /// Carbs in grams
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fat in grams
        #[arg(short, long, default_value = "0")]
        fat: f64,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM, default: now, or noon for other days)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List meals for a date
    List {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Only this meal type
        #[arg(short, long)]
        meal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update a meal by ID
    Update {
        /// Meal ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        calories: Option<f64>,
        #[arg(long)]
        protein: Option<f64>,
        #[arg(long)]
        carbs: Option<f64>,
        #[arg(long)]
        fat: Option<f64>,
        /// New meal type
        #[arg(long)]
        meal: Option<String>,
        /// Move to another date
        #[arg(long)]
        date: Option<String>,
        /// Move to another time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal by ID
    Delete {
        /// Meal ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy meals from one day to another
    Copy {
        /// Source date (YYYY-MM-DD or today/yesterday)
        from: String,
        /// Destination date
        to: String,
        /// Only copy this meal type
        #[arg(short, long)]
        meal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WaterCommands {
    /// Log water intake in ml
    Add {
        /// Amount in ml
        amount: f64,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show water entries and progress for a day
    Today {
        /// Date (default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a water entry by ID
    Delete {
        /// Water entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or set the daily water goal
    Goal {
        /// New goal in ml
        ml: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weight entry
    Log {
        /// Weight value (number)
        value: f64,
        /// Unit: kg or lbs (default: kg)
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Optional note
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history, newest first
    History {
        /// Number of days to show (default: all)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a weight entry by ID
    Delete {
        /// Weight entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Set body measurements and goal
    Set {
        /// Weight in kg
        #[arg(long)]
        weight: f64,
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// Age in years
        #[arg(long)]
        age: i64,
        /// male, female or other
        #[arg(long)]
        gender: String,
        /// sedentary, lightly_active, moderately_active, very_active, extra_active
        #[arg(long, default_value = "sedentary")]
        activity: String,
        /// lose_weight, maintain, gain_weight
        #[arg(long, default_value = "maintain")]
        goal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the profile with BMR, TDEE and targets
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the profile
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Save a custom food (nutrition per serving)
    Add {
        /// Food name
        name: String,
        /// Calories per serving
        #[arg(long)]
        calories: f64,
        /// Protein per serving (g)
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Carbs per serving (g)
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fat per serving (g)
        #[arg(long, default_value = "0")]
        fat: f64,
        /// Serving size in grams
        #[arg(long)]
        serving: Option<f64>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List custom foods, favorites and most used first
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search custom foods by name
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a custom food's favorite flag
    Favorite {
        /// Food name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log servings of a custom food as a meal
    Log {
        /// Food name
        name: String,
        /// Number of servings
        #[arg(short, long, default_value = "1")]
        servings: f64,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a custom food
    Delete {
        /// Food name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum NutritionCommands {
    /// Show nutrition for a food, per 100g and per serving
    Lookup {
        /// Food name (exact, case-insensitive)
        name: String,
        /// Amount in grams (default: typical serving)
        #[arg(short, long)]
        grams: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search foods by name
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List categories, or the foods in one category
    Categories {
        /// Category to list
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a food from the table as a meal
    Log {
        /// Food name
        name: String,
        /// Amount in grams (default: typical serving)
        #[arg(short, long)]
        grams: Option<f64>,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
struct ScanArgs {
    #[command(subcommand)]
    command: Option<ScanCommands>,
    /// Detections as LABEL:CONFIDENCE, e.g. banana:0.92 fruit:0.7
    labels: Vec<String>,
    /// Minimum confidence (default 0.5)
    #[arg(short, long)]
    threshold: Option<f64>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ScanCommands {
    /// Show recent scans, newest first
    History {
        /// Maximum number of scans
        #[arg(short, long, default_value = "20")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all scan history
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    tracing::debug!(path = %config.db_path.display(), "opening database");
    let svc = CaltrackService::new(&config.db_path)?;

    match cli.command {
        Commands::Meal { command } => match command {
            MealCommands::Log {
                name,
                calories,
                protein,
                carbs,
                fat,
                meal,
                date,
                time,
                json,
            } => cmd_meal_log(
                &svc,
                MealArgs {
                    name,
                    calories,
                    protein,
                    carbs,
                    fat,
                    meal,
                    date,
                    time,
                },
                json,
            ),
            MealCommands::List { date, meal, json } => {
                cmd_meal_list(&svc, date, meal.as_deref(), json)
            }
            MealCommands::Update {
                id,
                name,
                calories,
                protein,
                carbs,
                fat,
                meal,
                date,
                time,
                json,
            } => cmd_meal_update(
                &svc,
                id,
                MealEdit {
                    name,
                    calories,
                    protein,
                    carbs,
                    fat,
                    meal,
                    date,
                    time,
                },
                json,
            ),
            MealCommands::Delete { id, json } => cmd_meal_delete(&svc, id, json),
            MealCommands::Copy {
                from,
                to,
                meal,
                json,
            } => cmd_meal_copy(&svc, from, to, meal.as_deref(), json),
        },
        Commands::Summary { date, json } => cmd_summary(&svc, date, json),
        Commands::History { days, json } => cmd_history(&svc, days, json),
        Commands::Water { command } => match command {
            WaterCommands::Add {
                amount,
                date,
                time,
                json,
            } => cmd_water_add(&svc, amount, date, time.as_deref(), json),
            WaterCommands::Today { date, json } => cmd_water_today(&svc, date, json),
            WaterCommands::Delete { id, json } => cmd_water_delete(&svc, id, json),
            WaterCommands::Goal { ml, json } => cmd_water_goal(&svc, ml, json),
        },
        Commands::Weight { command } => match command {
            WeightCommands::Log {
                value,
                unit,
                date,
                time,
                note,
                json,
            } => cmd_weight_log(&svc, value, &unit, date, time.as_deref(), note, json),
            WeightCommands::History { days, json } => cmd_weight_history(&svc, days, json),
            WeightCommands::Delete { id, json } => cmd_weight_delete(&svc, id, json),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                weight,
                height,
                age,
                gender,
                activity,
                goal,
                json,
            } => cmd_profile_set(
                &svc,
                ProfileArgs {
                    weight_kg: weight,
                    height_cm: height,
                    age,
                    gender,
                    activity,
                    goal,
                },
                json,
            ),
            ProfileCommands::Show { json } => cmd_profile_show(&svc, json),
            ProfileCommands::Clear { json } => cmd_profile_clear(&svc, json),
        },
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                serving,
                favorite,
                json,
            } => cmd_food_add(
                &svc,
                FoodArgs {
                    name,
                    calories,
                    protein,
                    carbs,
                    fat,
                    serving,
                    favorite,
                },
                json,
            ),
            FoodCommands::List { favorites, json } => cmd_food_list(&svc, favorites, json),
            FoodCommands::Search { query, json } => cmd_food_search(&svc, &query, json),
            FoodCommands::Favorite { name, json } => cmd_food_favorite(&svc, &name, json),
            FoodCommands::Log {
                name,
                servings,
                meal,
                date,
                time,
                json,
            } => cmd_food_log(&svc, &name, servings, &meal, date, time.as_deref(), json),
            FoodCommands::Delete { name, json } => cmd_food_delete(&svc, &name, json),
        },
        Commands::Nutrition { command } => match command {
            NutritionCommands::Lookup { name, grams, json } => {
                cmd_nutrition_lookup(&svc, &name, grams, json)
            }
            NutritionCommands::Search { query, json } => cmd_nutrition_search(&svc, &query, json),
            NutritionCommands::Categories { category, json } => {
                cmd_nutrition_categories(&svc, category.as_deref(), json)
            }
            NutritionCommands::Log {
                name,
                grams,
                meal,
                date,
                time,
                json,
            } => cmd_nutrition_log(&svc, &name, grams, &meal, date, time.as_deref(), json),
        },
        Commands::Scan(args) => match args.command {
            Some(ScanCommands::History { limit, json }) => cmd_scan_history(&svc, limit, json),
            Some(ScanCommands::Clear { json }) => cmd_scan_clear(&svc, json),
            None => cmd_scan(svc, &args.labels, args.threshold, args.json),
        },
        Commands::Export { output, csv } => cmd_export(&svc, output.as_deref(), csv),
        Commands::Import { file, json } => cmd_import(&svc, &file, json),
        Commands::ImportMfp {
            file,
            dry_run,
            json,
        } => cmd_import_mfp(&svc, &file, dry_run, json),
    }
}
