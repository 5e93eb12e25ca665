/// Recipe normalization.
///
/// Spoonacular and API Ninjas describe recipes with different, often partly
/// missing fields. Everything here works on raw JSON and tries the known
/// fields in order until one yields something.
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{Provider, Recipe, RecipeTags, WinePairing};

/// Trims entries, collapses inner whitespace, drops empties and removes
/// case-insensitive duplicates keeping the first occurrence.
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.as_ref().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn string_array(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Text of one ingredient object, trying the descriptive fields first
fn ingredient_text(ingredient: &Value) -> Option<String> {
    if let Some(text) = ingredient.as_str() {
        return Some(text.to_string());
    }
    ["original", "originalString", "originalName", "name"]
        .iter()
        .find_map(|field| str_field(ingredient, field))
        .map(str::to_string)
}

pub fn extract_ingredients(raw: &Value) -> Vec<String> {
    for field in ["extendedIngredients", "missedIngredients", "usedIngredients"] {
        let found: Vec<String> = raw
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(ingredient_text).collect())
            .unwrap_or_default();
        if !found.is_empty() {
            return normalize_list(found);
        }
    }

    match raw.get("ingredients") {
        Some(Value::String(text)) => normalize_list(text.split(['|', '\n', ';'])),
        Some(Value::Array(items)) => normalize_list(items.iter().filter_map(ingredient_text)),
        _ => Vec::new(),
    }
}

pub fn extract_instructions(raw: &Value) -> Vec<String> {
    let steps: Vec<String> = raw
        .get("analyzedInstructions")
        .and_then(Value::as_array)
        .map(|sections| {
            sections
                .iter()
                .filter_map(|section| section.get("steps").and_then(Value::as_array))
                .flatten()
                .filter_map(|step| str_field(step, "step"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if !steps.is_empty() {
        return normalize_list(steps);
    }

    str_field(raw, "instructions")
        .map(|text| normalize_list(split_instruction_block(&strip_html(text))))
        .unwrap_or_default()
}

/// Removes tags, turning block-level tags into line breaks
pub fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut tag = String::new();

    for c in text.chars() {
        match c {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_lowercase();
                if matches!(name.as_str(), "li" | "p" | "br" | "br/" | "ol" | "ul" | "div") {
                    out.push('\n');
                }
            }
            _ if in_tag => tag.push(c),
            _ => out.push(c),
        }
    }

    out.replace("&nbsp;", " ").replace("&amp;", "&")
}

/// Splits free-form instructions into steps: one per line, or one per
/// sentence when everything is on a single line.
fn split_instruction_block(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let steps: Vec<String> = if lines.len() > 1 {
        lines.into_iter().map(str::to_string).collect()
    } else {
        let single = lines.first().copied().unwrap_or("");
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut chars = single.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            let at_boundary = matches!(c, '.' | '!' | '?')
                && chars.peek().map_or(true, |next| next.is_whitespace());
            if at_boundary {
                sentences.push(std::mem::take(&mut current));
            }
        }
        sentences.push(current);
        sentences
    };

    steps
        .into_iter()
        .map(|step| strip_step_number(step.trim()).to_string())
        .collect()
}

/// "1. Boil water" / "Step 2: Drain" → the text after the number
fn strip_step_number(step: &str) -> &str {
    let rest = step
        .strip_prefix("Step ")
        .or_else(|| step.strip_prefix("STEP "))
        .unwrap_or(step);
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return step;
    }
    let after = &rest[digits..];
    match after.chars().next() {
        Some('.' | ')' | ':') => after[1..].trim_start(),
        _ => step,
    }
}

fn nutrient_amount(raw: &Value, name: &str) -> Option<String> {
    raw.get("nutrition")?
        .get("nutrients")?
        .as_array()?
        .iter()
        .find(|n| str_field(n, "name").is_some_and(|n| n.eq_ignore_ascii_case(name)))
        .and_then(|n| {
            let amount = n.get("amount")?.as_f64()?;
            let unit = str_field(n, "unit").unwrap_or("");
            Some(format!("{} {}", amount.round(), unit).trim().to_string())
        })
}

pub fn extract_facts(raw: &Value) -> Vec<(String, String)> {
    let mut facts = Vec::new();

    if let Some(minutes) = raw.get("readyInMinutes").and_then(Value::as_u64) {
        facts.push(("Ready in".to_string(), format!("{} min", minutes)));
    }
    match raw.get("servings") {
        Some(Value::Number(n)) => facts.push(("Servings".to_string(), n.to_string())),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            facts.push(("Servings".to_string(), s.trim().to_string()))
        }
        _ => {}
    }
    if let Some(score) = raw.get("healthScore").and_then(Value::as_f64) {
        facts.push(("Health score".to_string(), format!("{}", score.round())));
    }
    if let Some(cents) = raw.get("pricePerServing").and_then(Value::as_f64) {
        facts.push((
            "Price per serving".to_string(),
            format!("${:.2}", cents / 100.0),
        ));
    }
    for nutrient in ["Calories", "Protein", "Fat", "Carbohydrates"] {
        if let Some(amount) = nutrient_amount(raw, nutrient) {
            facts.push((nutrient.to_string(), amount));
        }
    }

    facts
}

pub fn extract_tags(raw: &Value) -> RecipeTags {
    RecipeTags {
        cuisines: normalize_list(string_array(raw, "cuisines")),
        diets: normalize_list(string_array(raw, "diets")),
        dish_types: normalize_list(string_array(raw, "dishTypes")),
    }
}

const BADGES: [(&str, &str); 8] = [
    ("vegetarian", "Vegetarian"),
    ("vegan", "Vegan"),
    ("glutenFree", "Gluten free"),
    ("dairyFree", "Dairy free"),
    ("veryHealthy", "Very healthy"),
    ("cheap", "Budget friendly"),
    ("veryPopular", "Popular"),
    ("sustainable", "Sustainable"),
];

pub fn extract_badges(raw: &Value) -> Vec<String> {
    BADGES
        .iter()
        .filter(|(field, _)| raw.get(*field).and_then(Value::as_bool) == Some(true))
        .map(|(_, label)| label.to_string())
        .collect()
}

pub fn extract_wine_pairing(raw: &Value) -> Option<WinePairing> {
    let pairing = raw.get("winePairing")?;
    let wines = normalize_list(string_array(pairing, "pairedWines"));
    let text = str_field(pairing, "pairingText").map(str::to_string);
    if wines.is_empty() && text.is_none() {
        return None;
    }
    Some(WinePairing { wines, text })
}

/// Builds a recipe from a Spoonacular search result. Results without a
/// title are skipped.
pub fn normalize_spoonacular(raw: &Value) -> Option<Recipe> {
    let title = str_field(raw, "title")?.to_string();
    let key = raw
        .get("id")
        .and_then(Value::as_u64)
        .map(|id| id.to_string())
        .unwrap_or_else(|| title.to_lowercase());

    Some(Recipe {
        key,
        source: Provider::Spoonacular,
        ingredients: extract_ingredients(raw),
        instructions: extract_instructions(raw),
        facts: extract_facts(raw),
        tags: extract_tags(raw),
        badges: extract_badges(raw),
        wine_pairing: extract_wine_pairing(raw),
        score: raw.get("spoonacularScore").and_then(Value::as_f64),
        image_url: str_field(raw, "image").map(str::to_string),
        source_url: str_field(raw, "sourceUrl")
            .or_else(|| str_field(raw, "spoonacularSourceUrl"))
            .map(str::to_string),
        title,
        status: None,
    })
}

/// Builds a recipe from an API Ninjas result
pub fn normalize_api_ninjas(raw: &Value) -> Option<Recipe> {
    let title = str_field(raw, "title")?.to_string();

    Some(Recipe {
        key: title.to_lowercase(),
        source: Provider::ApiNinjas,
        ingredients: extract_ingredients(raw),
        instructions: extract_instructions(raw),
        facts: extract_facts(raw),
        tags: RecipeTags::default(),
        badges: Vec::new(),
        wine_pairing: None,
        score: None,
        image_url: None,
        source_url: None,
        title,
        status: None,
    })
}

/// Highest score first; missing scores count as 0; ties keep their order
pub fn sort_by_score(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| {
        let a = a.score.unwrap_or(0.0);
        let b = b.score.unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
}
