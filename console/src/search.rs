//! Faceted catalog search
//!
//! A facet value containing `-` is an inclusive integer range (`"128-256"`,
//! `"-256"`, `"128-"`). Any other value is split on whitespace and every token
//! must appear, case-insensitively, in the attribute. The `searchTerm` facet
//! matches against the template's accumulated `key:value` string.

use std::collections::BTreeMap;

use vcloud_model::template::parse_leading_int;
use vcloud_model::Template;

/// Facet name to search phrase
pub type Facets = BTreeMap<String, String>;

pub const SEARCH_TERM: &str = "searchTerm";

/// Templates matching every facet, in catalog order
pub fn search(templates: &[Template], facets: &Facets) -> Vec<Template> {
    templates
        .iter()
        .filter(|t| matches(t, facets))
        .cloned()
        .collect()
}

pub fn matches(template: &Template, facets: &Facets) -> bool {
    facets
        .iter()
        .all(|(facet, phrase)| facet_matches(template, facet, phrase))
}

fn facet_matches(template: &Template, facet: &str, phrase: &str) -> bool {
    if phrase.contains('-') {
        return range_matches(template, facet, phrase);
    }
    let tokens: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
    if tokens.is_empty() {
        return true;
    }
    match template.raw(facet) {
        Some(value) => {
            let value = value.to_lowercase();
            tokens.iter().all(|token| value.contains(token.as_str()))
        }
        None => false,
    }
}

fn clean_bound(bound: &str) -> String {
    bound.chars().filter(|c| !c.is_whitespace() && *c != ',').collect()
}

fn range_matches(template: &Template, facet: &str, phrase: &str) -> bool {
    let (lo, hi) = phrase.split_once('-').unwrap_or((phrase, ""));
    let (lo, hi) = (clean_bound(lo), clean_bound(hi));
    if lo.is_empty() && hi.is_empty() {
        return true;
    }

    let Some(value) = template.numeric(facet) else {
        return false;
    };
    let lower_ok = lo.is_empty() || parse_leading_int(&lo).is_some_and(|lo| lo <= value);
    let upper_ok = hi.is_empty() || parse_leading_int(&hi).is_some_and(|hi| value <= hi);
    lower_ok && upper_ok
}
