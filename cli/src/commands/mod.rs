mod data;
mod food;
mod helpers;
mod meal;
mod nutrition;
mod profile;
mod scan;
mod summary;
mod water;
mod weight;

pub(crate) use data::{cmd_export, cmd_import, cmd_import_mfp};
pub(crate) use food::{
    FoodArgs, cmd_food_add, cmd_food_delete, cmd_food_favorite, cmd_food_list, cmd_food_log,
    cmd_food_search,
};
pub(crate) use meal::{
    MealArgs, MealEdit, cmd_meal_copy, cmd_meal_delete, cmd_meal_list, cmd_meal_log,
    cmd_meal_update,
};
pub(crate) use nutrition::{
    cmd_nutrition_categories, cmd_nutrition_log, cmd_nutrition_lookup, cmd_nutrition_search,
};
pub(crate) use profile::{ProfileArgs, cmd_profile_clear, cmd_profile_set, cmd_profile_show};
pub(crate) use scan::{cmd_scan, cmd_scan_clear, cmd_scan_history};
pub(crate) use summary::{cmd_history, cmd_summary};
pub(crate) use water::{cmd_water_add, cmd_water_delete, cmd_water_goal, cmd_water_today};
pub(crate) use weight::{cmd_weight_delete, cmd_weight_history, cmd_weight_log};
