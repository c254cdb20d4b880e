use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Months, Utc};

use crate::models::{
    AccessScope, AggregationResult, ConsultationRecord, Dataset, LabelColors, MonthlyCount,
    Overview, UnitCount,
};
use crate::palette;

pub const TREND_MONTHS: u32 = 12;
pub const RECENT_DAYS: i64 = 30;
pub const TOP_UNITS: usize = 5;
pub const UNKNOWN_LABEL: &str = "Unknown";

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Full-access topic stats count every topic assignment in the store
    /// rather than only those of the selected records.
    pub topic_stats_global: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            topic_stats_global: true,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    // uppercasing may expand one char ("ﬁ" -> "FI"); only the first stays upper
    let mut upper = first.to_uppercase();
    let mut out = String::with_capacity(word.len());
    out.extend(upper.next());
    let tail: String = upper.chain(chars).collect();
    out.push_str(&tail.to_lowercase());
    out
}

/// Lowercases, then uppercases the first letter of each whitespace-separated
/// word. `"DKI JAKARTA"` becomes `"Dki Jakarta"`.
pub fn normalize_province(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn province_label(raw: Option<&str>) -> String {
    match raw.map(normalize_province) {
        Some(label) if !label.is_empty() => label,
        _ => UNKNOWN_LABEL.to_string(),
    }
}

fn topic_label(nama_topik: &Option<String>) -> String {
    nama_topik
        .clone()
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

fn count_labels<I>(labels: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = String>,
{
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

pub fn status_stats(records: &[&ConsultationRecord]) -> BTreeMap<String, usize> {
    count_labels(records.iter().map(|r| r.status.to_string()))
}

pub fn kategori_stats(records: &[&ConsultationRecord]) -> BTreeMap<String, usize> {
    count_labels(records.iter().map(|r| r.kategori.to_string()))
}

pub fn provinsi_stats(records: &[&ConsultationRecord]) -> BTreeMap<String, usize> {
    count_labels(
        records
            .iter()
            .map(|r| province_label(r.asal_provinsi.as_deref())),
    )
}

pub fn topik_stats(
    records: &[&ConsultationRecord],
    scope: &AccessScope,
    dataset: &Dataset,
    options: AggregateOptions,
) -> BTreeMap<String, usize> {
    if scope.is_full() && options.topic_stats_global {
        return count_labels(
            dataset
                .topic_links
                .iter()
                .map(|link| topic_label(&link.nama_topik)),
        );
    }
    count_labels(
        records
            .iter()
            .flat_map(|r| r.topic_names.iter())
            .map(topic_label),
    )
}

pub fn recent_count(records: &[&ConsultationRecord], now: DateTime<Utc>) -> usize {
    let cutoff = now - Duration::days(RECENT_DAYS);
    records.iter().filter(|r| r.created_at >= cutoff).count()
}

fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}

/// Twelve calendar months ending with the month of `now`, oldest first,
/// zero-filled where nothing was created.
pub fn monthly_trend(records: &[&ConsultationRecord], now: DateTime<Utc>) -> Vec<MonthlyCount> {
    let window_start = now
        .checked_sub_months(Months::new(TREND_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut buckets: HashMap<i32, usize> = HashMap::new();
    for record in records {
        if record.created_at < window_start {
            continue;
        }
        let created = record.created_at;
        *buckets
            .entry(month_index(created.year(), created.month()))
            .or_insert(0) += 1;
    }

    let current = month_index(now.year(), now.month());
    (0..TREND_MONTHS as i32)
        .rev()
        .map(|offset| {
            let index = current - offset;
            let year = index.div_euclid(12);
            let month0 = index.rem_euclid(12) as usize;
            MonthlyCount {
                month: format!("{year:04}-{:02}", month0 + 1),
                name: format!("{} {year}", MONTH_NAMES[month0]),
                count: buckets.get(&index).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Full access ranks every unit by assignment count and keeps the top
/// [`TOP_UNITS`]. Restricted access lists the caller's own units in id order.
pub fn unit_stats(
    records: &[&ConsultationRecord],
    scope: &AccessScope,
    dataset: &Dataset,
) -> Vec<UnitCount> {
    let unit_count = |unit_id: i32, count: usize| UnitCount {
        unit_id,
        nama_unit: dataset
            .unit_name(unit_id)
            .unwrap_or(UNKNOWN_LABEL)
            .to_string(),
        count,
    };

    match scope {
        AccessScope::FullAccess => {
            let mut counts: HashMap<i32, usize> = HashMap::new();
            for unit_id in records.iter().flat_map(|r| r.unit_ids.iter()) {
                *counts.entry(*unit_id).or_insert(0) += 1;
            }
            let mut ranked: Vec<UnitCount> = counts
                .into_iter()
                .map(|(unit_id, count)| unit_count(unit_id, count))
                .collect();
            ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.unit_id.cmp(&b.unit_id)));
            ranked.truncate(TOP_UNITS);
            ranked
        }
        AccessScope::RestrictedToUnits(units) => units
            .iter()
            .map(|unit_id| {
                let count = records
                    .iter()
                    .filter(|r| r.unit_ids.contains(unit_id))
                    .count();
                unit_count(*unit_id, count)
            })
            .collect(),
    }
}

fn colors_for(stats: &BTreeMap<String, usize>) -> BTreeMap<String, String> {
    stats
        .keys()
        .map(|label| (label.clone(), palette::color_for(label).to_string()))
        .collect()
}

/// Grouped statistics over the selected records. Keyword fields are left
/// empty for the keyword stage to fill.
pub fn aggregate(
    records: &[&ConsultationRecord],
    scope: &AccessScope,
    dataset: &Dataset,
    now: DateTime<Utc>,
    options: AggregateOptions,
) -> AggregationResult {
    let kategori_stats = kategori_stats(records);
    let topik_stats = topik_stats(records, scope, dataset, options);
    let provinsi_stats = provinsi_stats(records);
    let colors = LabelColors {
        kategori: colors_for(&kategori_stats),
        topik: colors_for(&topik_stats),
        provinsi: colors_for(&provinsi_stats),
    };

    AggregationResult {
        overview: Overview {
            total: records.len(),
            last_30_days: recent_count(records, now),
            access_level: scope.label().to_string(),
        },
        status_stats: status_stats(records),
        kategori_stats,
        topik_stats,
        provinsi_stats,
        keyword_stats: BTreeMap::new(),
        monthly_trend: monthly_trend(records, now),
        unit_stats: unit_stats(records, scope, dataset),
        top_keywords: Vec::new(),
        colors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Kategori, OrganizationalUnit, Status, TopicLink};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 9, 30, 0).unwrap()
    }

    fn record(id: i64, status: Status, created_at: DateTime<Utc>) -> ConsultationRecord {
        ConsultationRecord {
            id,
            status,
            kategori: Kategori::Aplikasi,
            created_at,
            asal_provinsi: Some("DKI JAKARTA".to_string()),
            uraian_kebutuhan_konsultasi: None,
            unit_ids: vec![2],
            topic_names: Vec::new(),
        }
    }

    fn link(konsultasi_id: i64, name: Option<&str>) -> TopicLink {
        TopicLink {
            konsultasi_id,
            nama_topik: name.map(str::to_string),
        }
    }

    fn dataset(records: Vec<ConsultationRecord>) -> Dataset {
        Dataset {
            records,
            units: vec![
                OrganizationalUnit {
                    id: 1,
                    nama_unit: "Superadmin".to_string(),
                },
                OrganizationalUnit {
                    id: 2,
                    nama_unit: "Direktorat Layanan".to_string(),
                },
                OrganizationalUnit {
                    id: 3,
                    nama_unit: "Direktorat Keamanan".to_string(),
                },
            ],
            topic_links: Vec::new(),
        }
    }

    #[test]
    fn counts_statuses() {
        let records = vec![
            record(1, Status::New, now()),
            record(2, Status::Done, now()),
            record(3, Status::Done, now()),
        ];
        let visible: Vec<&ConsultationRecord> = records.iter().collect();
        let stats = status_stats(&visible);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["new"], 1);
        assert_eq!(stats["done"], 2);
    }

    #[test]
    fn province_spellings_collapse() {
        assert_eq!(normalize_province("DKI JAKARTA"), "Dki Jakarta");
        assert_eq!(normalize_province("dki jakarta"), "Dki Jakarta");
        assert_eq!(normalize_province("  Dki   Jakarta "), "Dki Jakarta");
        assert_eq!(normalize_province("jawa BARAT"), "Jawa Barat");
        for raw in ["DKI JAKARTA", "nusa tenggara TIMUR", "", "  ", "Papua"] {
            let once = normalize_province(raw);
            assert_eq!(normalize_province(&once), once);
        }
    }

    #[test]
    fn province_casing_is_stable_for_expanding_uppercase() {
        assert_eq!(normalize_province("\u{fb01}ji"), "Fiji");
        assert_eq!(normalize_province("STRA\u{df}E"), "Stra\u{df}e");
        assert_eq!(normalize_province("\u{1c6}akarta"), "\u{1c4}akarta");
        for raw in [
            "\u{fb01}ji \u{fb01}JI",
            "stra\u{df}e",
            "\u{1c6}AKARTA",
            "\u{149}ORTH",
            "\u{130}STANBUL",
            "\u{3a3}\u{39f}\u{3a6}\u{399}\u{391}",
        ] {
            let once = normalize_province(raw);
            assert_eq!(normalize_province(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn missing_province_is_unknown() {
        assert_eq!(province_label(None), "Unknown");
        assert_eq!(province_label(Some("   ")), "Unknown");
        assert_eq!(province_label(Some("ACEH")), "Aceh");
    }

    #[test]
    fn monthly_trend_is_always_twelve_contiguous_months() {
        let trend = monthly_trend(&[], now());
        assert_eq!(trend.len(), 12);
        assert_eq!(trend[0].month, "2025-04");
        assert_eq!(trend[0].name, "Apr 2025");
        assert_eq!(trend[11].month, "2026-03");
        assert!(trend.windows(2).all(|pair| pair[0].month < pair[1].month));
        assert!(trend.iter().all(|entry| entry.count == 0));
    }

    #[test]
    fn monthly_trend_buckets_by_calendar_month() {
        let records = vec![
            record(1, Status::New, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
            record(2, Status::New, Utc.with_ymd_and_hms(2026, 1, 31, 23, 0, 0).unwrap()),
            record(3, Status::New, Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap()),
            record(4, Status::New, Utc.with_ymd_and_hms(2025, 12, 24, 8, 0, 0).unwrap()),
            record(5, Status::New, Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()),
        ];
        let visible: Vec<&ConsultationRecord> = records.iter().collect();
        let trend = monthly_trend(&visible, now());
        let counts: Vec<usize> = trend.iter().map(|entry| entry.count).collect();
        assert_eq!(counts, vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 1]);
        assert_eq!(trend[8].name, "Des 2025");
    }

    #[test]
    fn recent_count_uses_thirty_day_window() {
        let records = vec![
            record(1, Status::New, now() - Duration::days(3)),
            record(2, Status::New, now() - Duration::days(29)),
            record(3, Status::New, now() - Duration::days(31)),
        ];
        let visible: Vec<&ConsultationRecord> = records.iter().collect();
        assert_eq!(recent_count(&visible, now()), 2);
    }

    #[test]
    fn full_access_ranks_top_units() {
        let mut records = Vec::new();
        for (id, units) in [
            (1, vec![2]),
            (2, vec![2, 3]),
            (3, vec![3]),
            (4, vec![3]),
            (5, vec![4]),
            (6, vec![5]),
            (7, vec![6]),
            (8, vec![7]),
        ] {
            let mut r = record(id, Status::New, now());
            r.unit_ids = units;
            records.push(r);
        }
        let data = dataset(records);
        let visible: Vec<&ConsultationRecord> = data.records.iter().collect();
        let stats = unit_stats(&visible, &AccessScope::FullAccess, &data);
        let ranked: Vec<(i32, usize)> = stats.iter().map(|u| (u.unit_id, u.count)).collect();
        assert_eq!(ranked, vec![(3, 3), (2, 2), (4, 1), (5, 1), (6, 1)]);
        assert_eq!(stats[0].nama_unit, "Direktorat Keamanan");
        assert_eq!(stats[2].nama_unit, "Unknown");
    }

    #[test]
    fn restricted_access_lists_own_units_even_without_records() {
        let data = dataset(vec![record(1, Status::New, now())]);
        let visible: Vec<&ConsultationRecord> = data.records.iter().collect();
        let scope = AccessScope::from_unit_ids([3, 2]);
        let stats = unit_stats(&visible, &scope, &data);
        let listed: Vec<(i32, usize)> = stats.iter().map(|u| (u.unit_id, u.count)).collect();
        assert_eq!(listed, vec![(2, 1), (3, 0)]);
    }

    #[test]
    fn full_access_topic_stats_can_be_global() {
        let mut visible_record = record(1, Status::New, now());
        visible_record.topic_names = vec![Some("Arsitektur SPBE".to_string()), None];
        let mut data = dataset(vec![visible_record]);
        data.topic_links = vec![
            link(1, Some("Arsitektur SPBE")),
            link(1, None),
            link(99, Some("Arsitektur SPBE")),
        ];
        let visible: Vec<&ConsultationRecord> = data.records.iter().collect();

        let global = topik_stats(
            &visible,
            &AccessScope::FullAccess,
            &data,
            AggregateOptions::default(),
        );
        assert_eq!(global["Arsitektur SPBE"], 2);
        assert_eq!(global["Unknown"], 1);

        let scoped = topik_stats(
            &visible,
            &AccessScope::FullAccess,
            &data,
            AggregateOptions {
                topic_stats_global: false,
            },
        );
        assert_eq!(scoped["Arsitektur SPBE"], 1);

        let restricted = topik_stats(
            &visible,
            &AccessScope::from_unit_ids([2]),
            &data,
            AggregateOptions::default(),
        );
        assert_eq!(restricted["Arsitektur SPBE"], 1);
    }

    #[test]
    fn aggregate_fills_overview_and_colors() {
        let data = dataset(vec![
            record(1, Status::New, now() - Duration::days(2)),
            record(2, Status::Done, now() - Duration::days(90)),
        ]);
        let visible: Vec<&ConsultationRecord> = data.records.iter().collect();
        let result = aggregate(
            &visible,
            &AccessScope::FullAccess,
            &data,
            now(),
            AggregateOptions::default(),
        );
        assert_eq!(result.overview.total, 2);
        assert_eq!(result.overview.last_30_days, 1);
        assert_eq!(result.overview.access_level, "superadmin");
        assert_eq!(result.provinsi_stats["Dki Jakarta"], 2);
        assert_eq!(result.colors.kategori["aplikasi"], "#06B6D4");
        assert_eq!(result.colors.provinsi["Dki Jakarta"], "#8B5CF6");
        assert!(result.keyword_stats.is_empty());
    }
}
