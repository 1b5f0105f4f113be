//! Indicator frequency tables.
//!
//! Indicator collections come in three shapes (see `IndicatorCollection`).
//! They are flattened to plain labels, counted, and ranked by count. Ties
//! keep first-seen order across the input, so the same records always give
//! the same table.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::IndicatorCollection;

/// Default table size.
pub const TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Flatten one collection into labels. Keys of a flag set are the labels;
/// their values are ignored.
pub fn normalize(collection: Option<&IndicatorCollection>) -> Vec<String> {
    match collection {
        None => Vec::new(),
        Some(IndicatorCollection::Label(label)) => vec![label.clone()],
        Some(IndicatorCollection::Labels(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(IndicatorCollection::Flags(flags)) => flags.keys().cloned().collect(),
    }
}

/// Count labels across all collections and keep the `k` most frequent.
pub fn top_labels<'a, I>(collections: I, k: usize) -> Vec<LabelCount>
where
    I: IntoIterator<Item = Option<&'a IndicatorCollection>>,
{
    let mut counts: Vec<LabelCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for label in collections.into_iter().flat_map(normalize) {
        match index.get(&label) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(label.clone(), counts.len());
                counts.push(LabelCount { label, count: 1 });
            }
        }
    }

    // Stable: equal counts stay in first-seen order.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(k);
    counts
}
