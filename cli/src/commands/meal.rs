use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::models::{Meal, MealType, NewMeal, UpdateMeal, validate_meal_type};
use caltrack_core::service::CaltrackService;

use super::helpers::{
    exit_not_found, parse_date, print_json, resolve_logged_at, shift_logged_at, time_of_day,
    truncate,
};

pub(crate) struct MealArgs {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub meal: String,
    pub date: Option<String>,
    pub time: Option<String>,
}

pub(crate) struct MealEdit {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub meal: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

pub(crate) fn print_meal_line(meal: &Meal) {
    println!(
        "    [{}] {} {} - {:.0} kcal | P:{:.0}g C:{:.0}g F:{:.0}g",
        meal.id,
        time_of_day(&meal.logged_at),
        meal.name,
        meal.calories,
        meal.protein_g,
        meal.carbs_g,
        meal.fat_g
    );
}

pub(crate) fn cmd_meal_log(svc: &CaltrackService, args: MealArgs, json: bool) -> Result<()> {
    let meal_type = validate_meal_type(&args.meal)?;
    let logged_at = resolve_logged_at(args.date, args.time.as_deref())?;
    let meal = svc.log_meal(&NewMeal {
        name: args.name,
        calories: args.calories,
        protein_g: args.protein,
        carbs_g: args.carbs,
        fat_g: args.fat,
        meal_type,
        logged_at,
    })?;

    if json {
        print_json(&meal)?;
    } else {
        println!(
            "Logged {} for {} on {} - {:.0} kcal (id {})",
            meal.name, meal.meal_type, meal.date, meal.calories, meal.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_meal_list(
    svc: &CaltrackService,
    date: Option<String>,
    meal: Option<&str>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let meals = match meal {
        Some(m) => svc.meals_for_date_and_type(date, validate_meal_type(m)?)?,
        None => svc.meals_for_date(date)?,
    };

    if meals.is_empty() {
        exit_not_found(&format!("No meals logged for {date}"), json);
    }
    if json {
        return print_json(&meals);
    }

    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Meal")]
        meal_type: MealType,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .map(|m| MealRow {
            id: m.id,
            time: time_of_day(&m.logged_at),
            meal_type: m.meal_type,
            name: truncate(&m.name, 35),
            calories: format!("{:.0}", m.calories),
            protein: format!("{:.1}g", m.protein_g),
            carbs: format!("{:.1}g", m.carbs_g),
            fat: format!("{:.1}g", m.fat_g),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_meal_update(
    svc: &CaltrackService,
    id: i64,
    edit: MealEdit,
    json: bool,
) -> Result<()> {
    let logged_at = if edit.date.is_some() || edit.time.is_some() {
        let current = svc.get_meal(id)?;
        shift_logged_at(&current.logged_at, edit.date, edit.time.as_deref())?
    } else {
        None
    };

    let update = UpdateMeal {
        name: edit.name,
        calories: edit.calories,
        protein_g: edit.protein,
        carbs_g: edit.carbs,
        fat_g: edit.fat,
        meal_type: edit.meal.as_deref().map(validate_meal_type).transpose()?,
        logged_at,
    };
    if update.is_empty() {
        bail!(
            "Nothing to update. Provide at least one of --name, --calories, --protein, --carbs, --fat, --meal, --date or --time"
        );
    }

    let meal = svc.update_meal(id, &update)?;
    if json {
        print_json(&meal)?;
    } else {
        println!(
            "Updated meal {id}: {} for {} on {} - {:.0} kcal",
            meal.name, meal.meal_type, meal.date, meal.calories
        );
    }
    Ok(())
}

pub(crate) fn cmd_meal_delete(svc: &CaltrackService, id: i64, json: bool) -> Result<()> {
    if !svc.delete_meal(id)? {
        exit_not_found(&format!("Meal {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted meal {id}");
    }
    Ok(())
}

pub(crate) fn cmd_meal_copy(
    svc: &CaltrackService,
    from: String,
    to: String,
    meal: Option<&str>,
    json: bool,
) -> Result<()> {
    let from = parse_date(Some(from))?;
    let to = parse_date(Some(to))?;
    let meal_type = meal.map(validate_meal_type).transpose()?;

    let copied = svc.copy_meals(from, to, meal_type)?;
    if copied.is_empty() {
        let scope = meal_type.map_or_else(String::new, |mt| format!(" {mt}"));
        exit_not_found(&format!("No{scope} meals found for {from}"), json);
    }

    if json {
        print_json(&copied)?;
    } else {
        println!("Copied {} meals from {from} to {to}", copied.len());
    }
    Ok(())
}
