use anyhow::Result;

use caltrack_core::health::{ActivityLevel, FitnessGoal, Gender, HealthProfile};
use caltrack_core::models::HealthMetrics;
use caltrack_core::service::CaltrackService;

use super::helpers::{exit_not_found, print_json};

pub(crate) struct ProfileArgs {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: i64,
    pub gender: String,
    pub activity: String,
    pub goal: String,
}

fn print_metrics(metrics: &HealthMetrics) {
    let p = &metrics.profile;
    let d = &metrics.derived;
    println!(
        "Profile: {:.1} kg, {:.0} cm, {} years, {}",
        p.weight_kg,
        p.height_cm,
        p.age,
        p.gender.as_str()
    );
    println!(
        "  Activity: {} ({})",
        p.activity_level.as_str(),
        p.activity_level.description()
    );
    println!("  Goal: {}", p.fitness_goal.as_str());
    println!();
    println!("  BMI:    {:.1} ({})", d.bmi, d.bmi_category.description());
    println!("  BMR:    {:.0} kcal", d.bmr);
    println!("  TDEE:   {:.0} kcal", d.tdee);
    println!("  TARGET: {:.0} kcal", d.target_calories);
    println!(
        "  MACROS: P:{:.0}g C:{:.0}g F:{:.0}g",
        d.macros.protein_g, d.macros.carbs_g, d.macros.fat_g
    );
}

pub(crate) fn cmd_profile_set(svc: &CaltrackService, args: ProfileArgs, json: bool) -> Result<()> {
    let profile = HealthProfile {
        weight_kg: args.weight_kg,
        height_cm: args.height_cm,
        age: args.age,
        gender: args.gender.parse::<Gender>()?,
        activity_level: args.activity.parse::<ActivityLevel>()?,
        fitness_goal: args.goal.parse::<FitnessGoal>()?,
    };
    let metrics = svc.save_profile(&profile)?;

    if json {
        print_json(&metrics)?;
    } else {
        print_metrics(&metrics);
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(svc: &CaltrackService, json: bool) -> Result<()> {
    let Some(metrics) = svc.get_profile()? else {
        exit_not_found(
            "No profile set. Use `caltrack profile set` to create one.",
            json,
        );
    };
    if json {
        print_json(&metrics)?;
    } else {
        print_metrics(&metrics);
    }
    Ok(())
}

pub(crate) fn cmd_profile_clear(svc: &CaltrackService, json: bool) -> Result<()> {
    let cleared = svc.clear_profile()?;
    if json {
        println!("{}", serde_json::json!({ "cleared": cleared }));
    } else if cleared {
        println!("Profile cleared");
    } else {
        println!("No profile to clear");
    }
    Ok(())
}
