use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Unit id reserved for super-admins; membership grants unscoped access.
pub const SUPERADMIN_UNIT_ID: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    New,
    OnProcess,
    ReadyToSend,
    KonsultasiZoom,
    Done,
    FuPertanyaan,
    Cancel,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::OnProcess => "on process",
            Status::ReadyToSend => "ready to send",
            Status::KonsultasiZoom => "konsultasi zoom",
            Status::Done => "done",
            Status::FuPertanyaan => "FU pertanyaan",
            Status::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = InvalidField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(Status::New),
            "on process" => Ok(Status::OnProcess),
            "ready to send" => Ok(Status::ReadyToSend),
            "konsultasi zoom" => Ok(Status::KonsultasiZoom),
            "done" => Ok(Status::Done),
            "FU pertanyaan" => Ok(Status::FuPertanyaan),
            "cancel" => Ok(Status::Cancel),
            other => Err(InvalidField::new("status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kategori {
    TataKelola,
    Infrastruktur,
    Aplikasi,
    KeamananInformasi,
    Sdm,
}

impl Kategori {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kategori::TataKelola => "tata kelola",
            Kategori::Infrastruktur => "infrastruktur",
            Kategori::Aplikasi => "aplikasi",
            Kategori::KeamananInformasi => "keamanan informasi",
            Kategori::Sdm => "SDM",
        }
    }
}

impl fmt::Display for Kategori {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kategori {
    type Err = InvalidField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "tata kelola" => Ok(Kategori::TataKelola),
            "infrastruktur" => Ok(Kategori::Infrastruktur),
            "aplikasi" => Ok(Kategori::Aplikasi),
            "keamanan informasi" => Ok(Kategori::KeamananInformasi),
            "SDM" => Ok(Kategori::Sdm),
            other => Err(InvalidField::new("kategori", other)),
        }
    }
}

/// A stored value that does not fit its column's enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} value {value:?}")]
pub struct InvalidField {
    pub field: &'static str,
    pub value: String,
}

impl InvalidField {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsultationRecord {
    pub id: i64,
    pub status: Status,
    pub kategori: Kategori,
    pub created_at: DateTime<Utc>,
    pub asal_provinsi: Option<String>,
    pub uraian_kebutuhan_konsultasi: Option<String>,
    pub unit_ids: Vec<i32>,
    /// `nama_topik` of each assigned topic; `None` when the topic row is gone.
    pub topic_names: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationalUnit {
    pub id: i32,
    pub nama_unit: String,
}

/// One row of the system-wide consultation/topic join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLink {
    pub konsultasi_id: i64,
    pub nama_topik: Option<String>,
}

/// Everything the aggregation needs from the data store for one request.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<ConsultationRecord>,
    pub units: Vec<OrganizationalUnit>,
    pub topic_links: Vec<TopicLink>,
}

impl Dataset {
    pub fn unit_name(&self, unit_id: i32) -> Option<&str> {
        self.units
            .iter()
            .find(|unit| unit.id == unit_id)
            .map(|unit| unit.nama_unit.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    FullAccess,
    RestrictedToUnits(BTreeSet<i32>),
}

impl AccessScope {
    pub fn from_unit_ids<I>(unit_ids: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let units: BTreeSet<i32> = unit_ids.into_iter().collect();
        if units.contains(&SUPERADMIN_UNIT_ID) {
            AccessScope::FullAccess
        } else {
            AccessScope::RestrictedToUnits(units)
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, AccessScope::FullAccess)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccessScope::FullAccess => "superadmin",
            AccessScope::RestrictedToUnits(_) => "unit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total: usize,
    pub last_30_days: usize,
    pub access_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub month: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCount {
    pub unit_id: i32,
    pub nama_unit: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
    pub color: String,
}

/// Chart colors for every label that appears in the grouped stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelColors {
    pub kategori: BTreeMap<String, String>,
    pub topik: BTreeMap<String, String>,
    pub provinsi: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub overview: Overview,
    pub status_stats: BTreeMap<String, usize>,
    pub kategori_stats: BTreeMap<String, usize>,
    pub topik_stats: BTreeMap<String, usize>,
    pub provinsi_stats: BTreeMap<String, usize>,
    pub keyword_stats: BTreeMap<String, usize>,
    pub monthly_trend: Vec<MonthlyCount>,
    pub unit_stats: Vec<UnitCount>,
    pub top_keywords: Vec<KeywordCount>,
    pub colors: LabelColors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_label() {
        for status in [
            Status::New,
            Status::OnProcess,
            Status::ReadyToSend,
            Status::KonsultasiZoom,
            Status::Done,
            Status::FuPertanyaan,
            Status::Cancel,
        ] {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
    }

    #[test]
    fn unknown_kategori_is_rejected() {
        let err = "undefined".parse::<Kategori>().unwrap_err();
        assert_eq!(err.field, "kategori");
        assert_eq!(err.to_string(), "invalid kategori value \"undefined\"");
    }

    #[test]
    fn superadmin_unit_grants_full_access() {
        assert_eq!(AccessScope::from_unit_ids([4, 1]), AccessScope::FullAccess);
        let scope = AccessScope::from_unit_ids([4, 7]);
        assert!(!scope.is_full());
        assert_eq!(scope.label(), "unit");
    }
}
