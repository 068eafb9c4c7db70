use crate::domain::model::{FitMode, Template, Variant};
use crate::utils::error::{BulkError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// How each listing in a batch is titled, priced and laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRules {
    pub title_template: String,
    pub description_template: String,
    pub tags: Vec<String>,
    /// Price in minor units applied to every variant without its own price.
    pub price: Option<u32>,
    pub variant_prices: HashMap<String, u32>,
    /// Variants to publish; empty means all of them.
    pub variant_ids: Vec<String>,
    pub placeholder_fit: HashMap<String, FitMode>,
    pub skip_placeholders: Vec<String>,
}

impl Default for ListingRules {
    fn default() -> Self {
        Self {
            title_template: "{name}".to_string(),
            description_template: String::new(),
            tags: Vec::new(),
            price: None,
            variant_prices: HashMap::new(),
            variant_ids: Vec::new(),
            placeholder_fit: HashMap::new(),
            skip_placeholders: Vec::new(),
        }
    }
}

impl ListingRules {
    pub fn select_variants<'a>(&self, template: &'a Template) -> Result<Vec<&'a Variant>> {
        if let Some(missing) = self
            .variant_ids
            .iter()
            .find(|id| !template.variants.iter().any(|v| &v.id == *id))
        {
            return Err(BulkError::ValidationError {
                message: format!(
                    "variant '{}' is not part of template '{}'",
                    missing, template.id
                ),
            });
        }

        let selected: Vec<&Variant> = template
            .variants
            .iter()
            .filter(|v| self.variant_ids.is_empty() || self.variant_ids.contains(&v.id))
            .collect();

        if selected.is_empty() {
            return Err(BulkError::ValidationError {
                message: format!("template '{}' has no variants to publish", template.id),
            });
        }
        Ok(selected)
    }

    pub fn fit_for(&self, placeholder: &str, default: FitMode) -> FitMode {
        self.placeholder_fit
            .get(placeholder)
            .copied()
            .unwrap_or(default)
    }

    pub fn includes_placeholder(&self, placeholder: &str) -> bool {
        !self.skip_placeholders.iter().any(|p| p == placeholder)
    }

    pub fn price_for(&self, variant_id: &str) -> Option<u32> {
        self.variant_prices.get(variant_id).copied().or(self.price)
    }

    pub fn title(&self, vars: &HashMap<&str, String>) -> String {
        render_template(&self.title_template, vars).trim().to_string()
    }

    pub fn description(&self, vars: &HashMap<&str, String>) -> String {
        render_template(&self.description_template, vars)
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("static regex"))
}

/// Replaces `{key}` tokens; unknown keys are left as written.
pub fn render_template(text: &str, vars: &HashMap<&str, String>) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Template variables for the image at `index` (zero-based).
pub fn listing_vars(path: &str, index: usize, template: &Template) -> HashMap<&'static str, String> {
    let file_path = Path::new(path);
    let stem = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string();
    let file = file_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string();

    HashMap::from([
        ("name", humanize(&stem)),
        ("stem", stem),
        ("file", file),
        ("index", (index + 1).to_string()),
        ("template", template.name.clone()),
    ])
}

/// `sunset_over-the_bay` -> `Sunset Over The Bay`.
pub fn humanize(stem: &str) -> String {
    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Lowercase ASCII slug safe for object paths.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug
    }
}
