use anyhow::{Context, Result};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::models::validate_meal_type;
use caltrack_core::nutrition::{FoodCategory, NutritionInfo};
use caltrack_core::service::CaltrackService;

use super::helpers::{exit_not_found, print_json, resolve_logged_at};

pub(crate) fn print_nutrition_table(foods: &[&NutritionInfo]) {
    #[derive(Tabled)]
    struct NutritionRow {
        #[tabled(rename = "Name")]
        name: &'static str,
        #[tabled(rename = "Category")]
        category: FoodCategory,
        #[tabled(rename = "Cal/100g")]
        calories: String,
        #[tabled(rename = "P/100g")]
        protein: String,
        #[tabled(rename = "C/100g")]
        carbs: String,
        #[tabled(rename = "F/100g")]
        fat: String,
        #[tabled(rename = "Serving")]
        serving: String,
    }

    let rows: Vec<NutritionRow> = foods
        .iter()
        .map(|f| NutritionRow {
            name: f.name,
            category: f.category,
            calories: format!("{:.0}", f.calories_per_100g),
            protein: format!("{:.1}", f.protein_per_100g),
            carbs: format!("{:.1}", f.carbs_per_100g),
            fat: format!("{:.1}", f.fat_per_100g),
            serving: format!("{:.0}g", f.serving_g),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_nutrition_lookup(
    svc: &CaltrackService,
    name: &str,
    grams: Option<f64>,
    json: bool,
) -> Result<()> {
    let Some(info) = svc.foods().lookup(name) else {
        exit_not_found(
            &format!(
                "'{}' is not in the nutrition table. Try `caltrack nutrition search`.",
                name.trim()
            ),
            json,
        );
    };
    let serving = info.for_serving(grams.unwrap_or(info.serving_g));

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "food": info,
                "serving": serving,
            }))?
        );
        return Ok(());
    }

    println!("{} ({})", info.name, info.category);
    println!(
        "  Per 100g: {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g",
        info.calories_per_100g, info.protein_per_100g, info.carbs_per_100g, info.fat_per_100g
    );
    println!(
        "  Per {:.0}g: {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g",
        serving.grams, serving.calories, serving.protein_g, serving.carbs_g, serving.fat_g
    );
    Ok(())
}

pub(crate) fn cmd_nutrition_search(svc: &CaltrackService, query: &str, json: bool) -> Result<()> {
    let results = svc.foods().search(query);
    if results.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No foods match '{query}'");
        }
        std::process::exit(2);
    }
    if json {
        return print_json(&results);
    }
    print_nutrition_table(&results);
    Ok(())
}

pub(crate) fn cmd_nutrition_categories(
    svc: &CaltrackService,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let foods = svc.foods();

    if let Some(name) = category {
        let category: FoodCategory = name.parse()?;
        let members = foods.by_category(category);
        if json {
            return print_json(&members);
        }
        print_nutrition_table(&members);
        return Ok(());
    }

    if json {
        return print_json(&foods.grouped());
    }
    for (category, members) in foods.grouped() {
        let names: Vec<&str> = members.iter().map(|f| f.name).collect();
        println!("{category} ({}): {}", members.len(), names.join(", "));
    }
    Ok(())
}

pub(crate) fn cmd_nutrition_log(
    svc: &CaltrackService,
    name: &str,
    grams: Option<f64>,
    meal: &str,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let meal_type = validate_meal_type(meal)?;
    let logged_at = resolve_logged_at(date, time)?;
    let logged = svc
        .log_nutrition_food(name, grams, meal_type, logged_at)
        .context("Could not log food")?;

    if json {
        print_json(&logged)?;
    } else {
        println!(
            "Logged {} for {} on {} - {:.0} kcal (id {})",
            logged.name, logged.meal_type, logged.date, logged.calories, logged.id
        );
    }
    Ok(())
}
