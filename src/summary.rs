use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{AccessScope, AggregationResult, ConsultationRecord, Dataset, KeywordCount};
use crate::palette;
use crate::rake;
use crate::scope;
use crate::stats::{self, AggregateOptions};

pub const TOP_KEYWORDS: usize = 10;
pub const DEFAULT_MAX_TEXT_CHARS: usize = 20_000;

#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub aggregate: AggregateOptions,
    pub max_text_chars: usize,
    /// Count a phrase at most once per description.
    pub distinct_phrases: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            aggregate: AggregateOptions::default(),
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            distinct_phrases: true,
        }
    }
}

/// Successful response body: `{"success": true, "data": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Tallies the phrases ranked for each description.
///
/// With `distinct_phrases` set (the default) a count is the number of
/// descriptions that ranked the phrase, however often it repeats inside one
/// text. Unset, every ranked occurrence counts, so a phrase written twice in
/// one description adds 2. A description that cannot be processed is logged
/// and left out.
pub fn keyword_tally(
    records: &[&ConsultationRecord],
    options: &SummaryOptions,
) -> BTreeMap<String, usize> {
    let mut tally = BTreeMap::new();

    for record in records {
        let Some(text) = record.uraian_kebutuhan_konsultasi.as_deref() else {
            continue;
        };
        match rake::try_extract_keywords(text, options.max_text_chars, options.distinct_phrases) {
            Ok(phrases) => {
                for phrase in phrases {
                    *tally.entry(phrase).or_insert(0) += 1;
                }
            }
            Err(err) => {
                warn!(konsultasi_id = record.id, error = %err, "skipping keyword extraction");
            }
        }
    }

    tally
}

pub fn top_keywords(tally: &BTreeMap<String, usize>) -> Vec<KeywordCount> {
    let mut ranked: Vec<(&String, &usize)> = tally.iter().collect();
    // BTreeMap order breaks ties alphabetically
    ranked.sort_by(|a, b| b.1.cmp(a.1));

    ranked
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(keyword, count)| KeywordCount {
            keyword: keyword.clone(),
            count: *count,
            color: palette::color_for(keyword).to_string(),
        })
        .collect()
}

/// Selects what `access` may see, then aggregates and extracts keywords.
pub fn summarize(
    dataset: &Dataset,
    access: &AccessScope,
    now: DateTime<Utc>,
    options: SummaryOptions,
) -> AggregationResult {
    let visible = scope::select(&dataset.records, access);
    debug!(
        total = dataset.records.len(),
        visible = visible.len(),
        access_level = access.label(),
        "selected consultation records"
    );

    let mut result = stats::aggregate(&visible, access, dataset, now, options.aggregate);
    let tally = keyword_tally(&visible, &options);
    result.top_keywords = top_keywords(&tally);
    result.keyword_stats = tally;
    result
}
