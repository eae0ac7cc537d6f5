//! Cross-source deduplication and merge for collected items: group by an
//! item-type-specific key, keep the highest-confidence item, backfill any
//! field it leaves null from the runner-up, and record the runner-up's
//! `source_url` as an additional source.

use std::collections::HashMap;

use serde_json::Value;

use crate::types::CollectedItem;

pub fn normalize_name(raw: &str) -> String {
    const SUFFIXES: &[&str] = &[
        "llc", "l.l.c.", "inc.", "inc", "corporation", "corp.", "lp", "l.p.", "llp", "holdings",
        "group", "partners", "family office", "family investments", "capital",
    ];

    let mut normalized = raw.trim().to_lowercase();
    for suffix in SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.trim_end().to_string();
        }
        let with_comma = format!(", {suffix}");
        if let Some(stripped) = normalized.strip_suffix(&with_comma) {
            normalized = stripped.trim_end().to_string();
        }
    }

    let stripped: String = normalized
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn str_field(data: &HashMap<String, Value>, key: &str) -> String {
    data.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Key items group on for dedup; items of a type with no defined key
/// (or with an empty key value) are never deduped against one another.
fn dedup_key(target_id: &str, item: &CollectedItem) -> Option<String> {
    match item.item_type.as_str() {
        "team_member" => {
            let name = normalize_name(&str_field(&item.data, "full_name"));
            (!name.is_empty()).then(|| format!("team:{target_id}:{name}"))
        }
        "portfolio_company" => {
            let company = normalize_name(&str_field(&item.data, "company_name"));
            (!company.is_empty()).then(|| format!("portfolio:{target_id}:{company}"))
        }
        "contact_info" => {
            let email = normalize_email(&str_field(&item.data, "email"));
            if !email.is_empty() {
                return Some(format!("contact:email:{email}"));
            }
            let phone = normalize_phone(&str_field(&item.data, "phone"));
            (!phone.is_empty()).then(|| format!("contact:phone:{phone}"))
        }
        "news_item" => item.source_url.as_ref().map(|url| format!("news:{url}")),
        _ => None,
    }
}

fn merge(mut primary: CollectedItem, secondary: CollectedItem) -> CollectedItem {
    for (key, value) in secondary.data {
        let is_null = matches!(primary.data.get(&key), None | Some(Value::Null));
        if is_null {
            primary.data.insert(key, value);
        }
    }

    if let Some(secondary_url) = secondary.source_url {
        if primary.source_url.as_deref() != Some(secondary_url.as_str()) {
            let additional = primary
                .data
                .entry("additional_sources".to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = additional {
                list.push(Value::String(secondary_url));
            }
        }
    }

    primary
}

/// Deduplicate items collected for one target across all its sources.
/// Items with no dedup key (an unrecognized `item_type`, or missing the
/// fields a key needs) pass through unmodified and unmerged.
pub fn deduplicate(target_id: &str, items: Vec<CollectedItem>) -> Vec<CollectedItem> {
    let mut grouped: HashMap<String, Vec<CollectedItem>> = HashMap::new();
    let mut ungrouped = Vec::new();

    for item in items {
        match dedup_key(target_id, &item) {
            Some(key) => grouped.entry(key).or_default().push(item),
            None => ungrouped.push(item),
        }
    }

    let mut result = ungrouped;
    for (_key, mut group) in grouped {
        group.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        let mut iter = group.into_iter();
        let mut best = iter.next().expect("group is non-empty by construction");
        for runner_up in iter {
            best = merge(best, runner_up);
        }
        result.push(best);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    fn item(item_type: &str, fields: &[(&str, &str)], confidence: Confidence) -> CollectedItem {
        let data = fields.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect();
        CollectedItem::new(item_type, data).with_confidence(confidence)
    }

    #[test]
    fn strips_company_suffix_and_punctuation() {
        assert_eq!(normalize_name("Acme Capital, LLC."), "acme");
    }

    #[test]
    fn dedup_keeps_highest_confidence_and_backfills() {
        let high = item("portfolio_company", &[("company_name", "Acme Inc")], Confidence::High)
            .with_source_url("https://a.example");
        let low = item(
            "portfolio_company",
            &[("company_name", "Acme Inc"), ("sector", "Fintech")],
            Confidence::Low,
        )
        .with_source_url("https://b.example");

        let result = deduplicate("fo-1", vec![high, low]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].confidence, Confidence::High);
        assert_eq!(result[0].data.get("sector").and_then(Value::as_str), Some("Fintech"));
        let additional = result[0].data.get("additional_sources").unwrap();
        assert_eq!(additional, &Value::Array(vec![Value::String("https://b.example".to_string())]));
    }

    #[test]
    fn items_without_a_dedup_key_pass_through() {
        let a = item("custom_note", &[("text", "hello")], Confidence::Medium);
        let b = item("custom_note", &[("text", "world")], Confidence::Medium);
        let result = deduplicate("fo-1", vec![a, b]);
        assert_eq!(result.len(), 2);
    }
}
