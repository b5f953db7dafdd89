//! Turns object-classifier output into food suggestions.
//!
//! The classifier itself is external. [`ObjectClassifier`] is the seam: the
//! CLI and the tests feed labels through [`LabelClassifier`].

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::nutrition::{FoodNutritionDatabase, NutritionInfo};

/// Detections below this confidence are ignored.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Suggestions for generic classifier labels, most likely first.
const CATEGORY_SUGGESTIONS: &[(&str, &[&str])] = &[
    ("fruit", &["Apple", "Banana", "Orange"]),
    ("vegetable", &["Broccoli", "Carrot", "Salad"]),
    ("plant", &["Salad", "Spinach", "Broccoli"]),
    ("meat", &["Chicken Breast", "Beef Steak", "Pork Chop"]),
    ("fish", &["Salmon", "Tuna", "Shrimp"]),
    ("seafood", &["Shrimp", "Salmon", "Tuna"]),
    ("bread", &["Bread", "Bagel", "Tortilla"]),
    ("baked goods", &["Bread", "Bagel", "Donut"]),
    ("grain", &["White Rice", "Pasta", "Oatmeal"]),
    ("dairy", &["Milk", "Greek Yogurt", "Cheddar Cheese"]),
    ("dessert", &["Ice Cream", "Donut", "Dark Chocolate"]),
    ("snack", &["Almonds", "Popcorn", "Granola Bar"]),
    ("fast food", &["Hamburger", "Pizza", "French Fries"]),
    ("food", &["Sandwich", "Pizza", "Salad"]),
    ("drink", &["Coffee", "Orange Juice", "Green Tea"]),
    ("beverage", &["Coffee", "Orange Juice", "Green Tea"]),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f64,
}

/// Parses `label:confidence`, e.g. `banana:0.87`.
impl FromStr for DetectedObject {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (label, confidence) = s
            .rsplit_once(':')
            .with_context(|| format!("Expected LABEL:CONFIDENCE, got '{s}'"))?;
        let label = label.trim();
        if label.is_empty() {
            bail!("Label must not be empty in '{s}'");
        }
        let confidence: f64 = confidence
            .trim()
            .parse()
            .with_context(|| format!("Invalid confidence in '{s}'"))?;
        if !(0.0..=1.0).contains(&confidence) {
            bail!("Confidence must be between 0 and 1, got {confidence}");
        }
        Ok(DetectedObject {
            label: label.to_string(),
            confidence,
        })
    }
}

pub trait ObjectClassifier {
    fn classify(&self, image: &[u8]) -> Result<Vec<DetectedObject>>;
}

/// Returns a fixed set of detections regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct LabelClassifier {
    objects: Vec<DetectedObject>,
}

impl LabelClassifier {
    #[must_use]
    pub fn new(objects: Vec<DetectedObject>) -> Self {
        Self { objects }
    }
}

impl ObjectClassifier for LabelClassifier {
    fn classify(&self, _image: &[u8]) -> Result<Vec<DetectedObject>> {
        Ok(self.objects.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodSuggestion {
    pub name: String,
    /// Category of the match, or the classifier label that produced it.
    pub category: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionInfo>,
}

#[derive(Debug, Clone, Copy)]
pub struct FoodAnalyzer {
    foods: FoodNutritionDatabase,
    threshold: f64,
}

impl Default for FoodAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FoodAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            foods: FoodNutritionDatabase::builtin(),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn analyze_image(
        &self,
        classifier: &dyn ObjectClassifier,
        image: &[u8],
    ) -> Result<Vec<FoodSuggestion>> {
        let objects = classifier.classify(image).context("Classifier failed")?;
        Ok(self.analyze(&objects))
    }

    /// Suggestions sorted by confidence, highest first, one per food name.
    #[must_use]
    pub fn analyze(&self, objects: &[DetectedObject]) -> Vec<FoodSuggestion> {
        let mut suggestions: Vec<FoodSuggestion> = Vec::new();
        for object in objects {
            if !object.confidence.is_finite() || object.confidence < self.threshold {
                tracing::debug!(
                    label = %object.label,
                    confidence = object.confidence,
                    "below threshold"
                );
                continue;
            }
            let found = self.suggestions_for(object);
            if found.is_empty() {
                tracing::debug!(label = %object.label, "no suggestions for label");
            }
            suggestions.extend(found);
        }

        // Stable sort keeps the per-category order among equal confidences.
        suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut seen: Vec<String> = Vec::new();
        suggestions.retain(|s| {
            let key = s.name.to_lowercase();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        suggestions
    }

    fn suggestions_for(&self, object: &DetectedObject) -> Vec<FoodSuggestion> {
        if let Some(info) = self.foods.lookup(&object.label) {
            return vec![FoodSuggestion {
                name: info.name.to_string(),
                category: info.category.to_string(),
                confidence: object.confidence,
                nutrition: Some(*info),
            }];
        }

        let label = object.label.trim().to_lowercase();
        CATEGORY_SUGGESTIONS
            .iter()
            .find(|(category, _)| *category == label)
            .map(|(category, names)| {
                names
                    .iter()
                    .map(|name| FoodSuggestion {
                        name: (*name).to_string(),
                        category: (*category).to_string(),
                        confidence: object.confidence,
                        nutrition: self.foods.lookup(name).copied(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
