use anyhow::{Context, Result};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::models::{CustomFood, NewCustomFood, validate_meal_type};
use caltrack_core::service::CaltrackService;

use super::helpers::{exit_not_found, print_json, resolve_logged_at, truncate};

pub(crate) struct FoodArgs {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub serving: Option<f64>,
    pub favorite: bool,
}

pub(crate) fn print_custom_food_table(foods: &[CustomFood]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "★")]
        favorite: &'static str,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
        #[tabled(rename = "Serving")]
        serving: String,
        #[tabled(rename = "Used")]
        use_count: i64,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .map(|f| FoodRow {
            id: f.id,
            favorite: if f.is_favorite { "★" } else { "" },
            name: truncate(&f.name, 35),
            calories: format!("{:.0}", f.calories),
            protein: format!("{:.1}", f.protein_g),
            carbs: format!("{:.1}", f.carbs_g),
            fat: format!("{:.1}", f.fat_g),
            serving: f.serving_g.map_or_else(|| "-".to_string(), |g| format!("{g:.0}g")),
            use_count: f.use_count,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn find_food(svc: &CaltrackService, name: &str) -> Result<CustomFood> {
    svc.find_custom_food(name)?
        .with_context(|| format!("No custom food named '{}'", name.trim()))
}

pub(crate) fn cmd_food_add(svc: &CaltrackService, args: FoodArgs, json: bool) -> Result<()> {
    let mut food = svc.add_custom_food(&NewCustomFood {
        name: args.name,
        calories: args.calories,
        protein_g: args.protein,
        carbs_g: args.carbs,
        fat_g: args.fat,
        serving_g: args.serving,
    })?;
    if args.favorite {
        food = svc.set_favorite(food.id, true)?;
    }

    if json {
        print_json(&food)?;
    } else {
        println!(
            "Added custom food '{}' (id {}) - {:.0} kcal per serving",
            food.name, food.id, food.calories
        );
    }
    Ok(())
}

pub(crate) fn cmd_food_list(svc: &CaltrackService, favorites: bool, json: bool) -> Result<()> {
    let foods = if favorites {
        svc.favorite_foods()?
    } else {
        svc.list_custom_foods()?
    };

    if foods.is_empty() {
        let what = if favorites { "favorite" } else { "custom" };
        exit_not_found(&format!("No {what} foods saved"), json);
    }
    if json {
        return print_json(&foods);
    }
    print_custom_food_table(&foods);
    Ok(())
}

pub(crate) fn cmd_food_search(svc: &CaltrackService, query: &str, json: bool) -> Result<()> {
    let foods = svc.search_custom_foods(query)?;
    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No custom foods match '{query}'");
        }
        std::process::exit(2);
    }
    if json {
        return print_json(&foods);
    }
    print_custom_food_table(&foods);
    Ok(())
}

pub(crate) fn cmd_food_favorite(svc: &CaltrackService, name: &str, json: bool) -> Result<()> {
    let food = find_food(svc, name)?;
    let food = svc.toggle_favorite(food.id)?;
    if json {
        print_json(&food)?;
    } else if food.is_favorite {
        println!("'{}' added to favorites", food.name);
    } else {
        println!("'{}' removed from favorites", food.name);
    }
    Ok(())
}

pub(crate) fn cmd_food_log(
    svc: &CaltrackService,
    name: &str,
    servings: f64,
    meal: &str,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let meal_type = validate_meal_type(meal)?;
    let logged_at = resolve_logged_at(date, time)?;
    let logged = svc.log_custom_food(name, servings, meal_type, logged_at)?;

    if json {
        print_json(&logged)?;
    } else {
        println!(
            "Logged {servings} x {} for {} on {} - {:.0} kcal (id {})",
            logged.name, logged.meal_type, logged.date, logged.calories, logged.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_food_delete(svc: &CaltrackService, name: &str, json: bool) -> Result<()> {
    let Some(food) = svc.find_custom_food(name)? else {
        exit_not_found(&format!("No custom food named '{}'", name.trim()), json);
    };
    svc.delete_custom_food(food.id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": food.id }));
    } else {
        println!("Deleted custom food '{}'", food.name);
    }
    Ok(())
}
