//! Built-in nutrition table for common foods.
//!
//! Values are per 100 g. The table is compiled into the binary and never
//! changes at runtime; user-defined foods live in the `custom_foods` table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    Fruit,
    Vegetable,
    Protein,
    Grain,
    Dairy,
    Snack,
    FastFood,
    Beverage,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 8] = [
        FoodCategory::Fruit,
        FoodCategory::Vegetable,
        FoodCategory::Protein,
        FoodCategory::Grain,
        FoodCategory::Dairy,
        FoodCategory::Snack,
        FoodCategory::FastFood,
        FoodCategory::Beverage,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FoodCategory::Fruit => "fruit",
            FoodCategory::Vegetable => "vegetable",
            FoodCategory::Protein => "protein",
            FoodCategory::Grain => "grain",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Snack => "snack",
            FoodCategory::FastFood => "fast_food",
            FoodCategory::Beverage => "beverage",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase().replace(['-', ' '], "_");
        match FoodCategory::ALL.iter().find(|c| c.as_str() == lower) {
            Some(c) => Ok(*c),
            None => bail!(
                "Invalid category '{s}'. Must be one of: {}",
                FoodCategory::ALL.map(FoodCategory::as_str).join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutritionInfo {
    pub name: &'static str,
    pub category: FoodCategory,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
    /// Typical single serving.
    pub serving_g: f64,
}

/// Nutrition values for a concrete amount of a food.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServingNutrition {
    pub grams: f64,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl NutritionInfo {
    #[must_use]
    pub fn for_serving(&self, grams: f64) -> ServingNutrition {
        let factor = grams / 100.0;
        ServingNutrition {
            grams,
            calories: self.calories_per_100g * factor,
            protein_g: self.protein_per_100g * factor,
            carbs_g: self.carbs_per_100g * factor,
            fat_g: self.fat_per_100g * factor,
        }
    }

    #[must_use]
    pub fn default_serving(&self) -> ServingNutrition {
        self.for_serving(self.serving_g)
    }
}

macro_rules! food {
    ($name:literal, $cat:ident, $cal:expr, $p:expr, $c:expr, $f:expr, $serving:expr) => {
        NutritionInfo {
            name: $name,
            category: FoodCategory::$cat,
            calories_per_100g: $cal,
            protein_per_100g: $p,
            carbs_per_100g: $c,
            fat_per_100g: $f,
            serving_g: $serving,
        }
    };
}

static FOODS: &[NutritionInfo] = &[
    // Fruit
    food!("Apple", Fruit, 52.0, 0.3, 14.0, 0.2, 182.0),
    food!("Avocado", Fruit, 160.0, 2.0, 8.5, 14.7, 150.0),
    food!("Banana", Fruit, 89.0, 1.1, 23.0, 0.3, 118.0),
    food!("Blueberries", Fruit, 57.0, 0.7, 14.0, 0.3, 148.0),
    food!("Grapes", Fruit, 69.0, 0.7, 18.0, 0.2, 151.0),
    food!("Mango", Fruit, 60.0, 0.8, 15.0, 0.4, 165.0),
    food!("Orange", Fruit, 47.0, 0.9, 12.0, 0.1, 131.0),
    food!("Pear", Fruit, 57.0, 0.4, 15.0, 0.1, 178.0),
    food!("Pineapple", Fruit, 50.0, 0.5, 13.0, 0.1, 165.0),
    food!("Strawberries", Fruit, 32.0, 0.7, 7.7, 0.3, 152.0),
    food!("Watermelon", Fruit, 30.0, 0.6, 7.6, 0.2, 280.0),
    // Vegetable
    food!("Bell Pepper", Vegetable, 31.0, 1.0, 6.0, 0.3, 119.0),
    food!("Broccoli", Vegetable, 34.0, 2.8, 7.0, 0.4, 91.0),
    food!("Carrot", Vegetable, 41.0, 0.9, 10.0, 0.2, 61.0),
    food!("Corn", Vegetable, 86.0, 3.3, 19.0, 1.4, 90.0),
    food!("Cucumber", Vegetable, 15.0, 0.7, 3.6, 0.1, 104.0),
    food!("Lettuce", Vegetable, 15.0, 1.4, 2.9, 0.2, 36.0),
    food!("Potato", Vegetable, 77.0, 2.0, 17.0, 0.1, 173.0),
    food!("Salad", Vegetable, 20.0, 1.5, 3.5, 0.2, 100.0),
    food!("Spinach", Vegetable, 23.0, 2.9, 3.6, 0.4, 30.0),
    food!("Sweet Potato", Vegetable, 86.0, 1.6, 20.0, 0.1, 130.0),
    food!("Tomato", Vegetable, 18.0, 0.9, 3.9, 0.2, 123.0),
    // Protein
    food!("Beef Steak", Protein, 271.0, 25.0, 0.0, 19.0, 150.0),
    food!("Chicken Breast", Protein, 165.0, 31.0, 0.0, 3.6, 120.0),
    food!("Egg", Protein, 155.0, 13.0, 1.1, 11.0, 50.0),
    food!("Lentils", Protein, 116.0, 9.0, 20.0, 0.4, 198.0),
    food!("Pork Chop", Protein, 231.0, 25.0, 0.0, 14.0, 145.0),
    food!("Salmon", Protein, 208.0, 20.0, 0.0, 13.0, 154.0),
    food!("Shrimp", Protein, 99.0, 24.0, 0.2, 0.3, 85.0),
    food!("Tofu", Protein, 76.0, 8.0, 1.9, 4.8, 126.0),
    food!("Tuna", Protein, 132.0, 28.0, 0.0, 1.3, 100.0),
    food!("Turkey", Protein, 135.0, 30.0, 0.0, 1.0, 100.0),
    // Grain
    food!("Bagel", Grain, 250.0, 10.0, 49.0, 1.5, 105.0),
    food!("Bread", Grain, 265.0, 9.0, 49.0, 3.2, 30.0),
    food!("Brown Rice", Grain, 112.0, 2.6, 23.5, 0.9, 195.0),
    food!("Oatmeal", Grain, 68.0, 2.4, 12.0, 1.4, 234.0),
    food!("Pasta", Grain, 131.0, 5.0, 25.0, 1.1, 140.0),
    food!("Quinoa", Grain, 120.0, 4.4, 21.0, 1.9, 185.0),
    food!("Tortilla", Grain, 218.0, 5.7, 36.0, 5.4, 45.0),
    food!("White Rice", Grain, 130.0, 2.7, 28.0, 0.3, 158.0),
    // Dairy
    food!("Butter", Dairy, 717.0, 0.9, 0.1, 81.0, 14.0),
    food!("Cheddar Cheese", Dairy, 403.0, 25.0, 1.3, 33.0, 28.0),
    food!("Cottage Cheese", Dairy, 98.0, 11.0, 3.4, 4.3, 113.0),
    food!("Greek Yogurt", Dairy, 59.0, 10.0, 3.6, 0.4, 170.0),
    food!("Milk", Dairy, 42.0, 3.4, 5.0, 1.0, 244.0),
    // Snack
    food!("Almonds", Snack, 579.0, 21.0, 22.0, 50.0, 28.0),
    food!("Dark Chocolate", Snack, 546.0, 4.9, 61.0, 31.0, 28.0),
    food!("Granola Bar", Snack, 471.0, 10.0, 64.0, 20.0, 25.0),
    food!("Ice Cream", Snack, 207.0, 3.5, 24.0, 11.0, 66.0),
    food!("Peanut Butter", Snack, 588.0, 25.0, 20.0, 50.0, 32.0),
    food!("Popcorn", Snack, 387.0, 13.0, 78.0, 4.5, 8.0),
    food!("Potato Chips", Snack, 536.0, 7.0, 53.0, 35.0, 28.0),
    // Fast food
    food!("Burrito", FastFood, 206.0, 8.0, 26.0, 7.0, 220.0),
    food!("Donut", FastFood, 452.0, 4.9, 51.0, 25.0, 60.0),
    food!("French Fries", FastFood, 312.0, 3.4, 41.0, 15.0, 117.0),
    food!("Hamburger", FastFood, 295.0, 17.0, 24.0, 14.0, 110.0),
    food!("Hot Dog", FastFood, 290.0, 10.0, 4.0, 26.0, 52.0),
    food!("Pizza", FastFood, 266.0, 11.0, 33.0, 10.0, 107.0),
    food!("Sandwich", FastFood, 250.0, 11.0, 30.0, 9.0, 150.0),
    food!("Sushi", FastFood, 143.0, 6.0, 29.0, 0.6, 150.0),
    // Beverage
    food!("Coffee", Beverage, 2.0, 0.3, 0.0, 0.0, 240.0),
    food!("Cola", Beverage, 42.0, 0.0, 10.6, 0.0, 355.0),
    food!("Green Tea", Beverage, 1.0, 0.0, 0.2, 0.0, 240.0),
    food!("Orange Juice", Beverage, 45.0, 0.7, 10.0, 0.2, 248.0),
];

/// Read-only lookup over the built-in table.
#[derive(Debug, Clone, Copy)]
pub struct FoodNutritionDatabase {
    foods: &'static [NutritionInfo],
}

impl Default for FoodNutritionDatabase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FoodNutritionDatabase {
    #[must_use]
    pub fn builtin() -> Self {
        Self { foods: FOODS }
    }

    #[must_use]
    pub fn all(&self) -> &'static [NutritionInfo] {
        self.foods
    }

    /// Case-insensitive exact match on the food name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&'static NutritionInfo> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.foods.iter().find(|f| f.name.to_lowercase() == needle)
    }

    /// Case-insensitive substring search, sorted by name. Blank queries match nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&'static NutritionInfo> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut results: Vec<&'static NutritionInfo> = self
            .foods
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .collect();
        results.sort_by(|a, b| a.name.cmp(b.name));
        results
    }

    #[must_use]
    pub fn by_category(&self, category: FoodCategory) -> Vec<&'static NutritionInfo> {
        let mut results: Vec<&'static NutritionInfo> = self
            .foods
            .iter()
            .filter(|f| f.category == category)
            .collect();
        results.sort_by(|a, b| a.name.cmp(b.name));
        results
    }

    /// Categories that have at least one food, in declaration order.
    #[must_use]
    pub fn categories(&self) -> Vec<FoodCategory> {
        FoodCategory::ALL
            .into_iter()
            .filter(|c| self.foods.iter().any(|f| f.category == *c))
            .collect()
    }

    #[must_use]
    pub fn grouped(&self) -> BTreeMap<FoodCategory, Vec<&'static NutritionInfo>> {
        let mut groups: BTreeMap<FoodCategory, Vec<&'static NutritionInfo>> = BTreeMap::new();
        for food in self.foods {
            groups.entry(food.category).or_default().push(food);
        }
        for foods in groups.values_mut() {
            foods.sort_by(|a, b| a.name.cmp(b.name));
        }
        groups
    }
}
