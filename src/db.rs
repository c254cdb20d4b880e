use std::collections::{HashMap, HashSet};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    ConsultationRecord, Dataset, InvalidField, Kategori, OrganizationalUnit, Status, TopicLink,
};
use crate::source::ConsultationSource;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let units = vec![
        (1, "Superadmin"),
        (2, "Direktorat Layanan Digital"),
        (3, "Direktorat Keamanan Informasi"),
        (4, "Direktorat Infrastruktur"),
    ];

    for (id, name) in units {
        sqlx::query(
            r#"
            INSERT INTO klinik.units (id, nama_unit)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET nama_unit = EXCLUDED.nama_unit
            "#,
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let topics = vec![
        (1, "Arsitektur SPBE"),
        (2, "Peta Rencana SPBE"),
        (3, "Audit TIK"),
        (4, "Pusat Data Nasional"),
    ];

    for (id, name) in topics {
        sqlx::query(
            r#"
            INSERT INTO klinik.topics (id, nama_topik)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET nama_topik = EXCLUDED.nama_topik
            "#,
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let consultations = vec![
        (
            "seed-001",
            "new",
            "tata kelola",
            now - Duration::days(3),
            "DKI JAKARTA",
            "Kami membutuhkan konsultasi untuk implementasi SPBE yang lebih baik.",
            vec![2],
            vec![1, 2],
        ),
        (
            "seed-002",
            "done",
            "keamanan informasi",
            now - Duration::days(40),
            "jawa barat",
            "Pendampingan audit keamanan informasi aplikasi layanan publik.",
            vec![3],
            vec![3],
        ),
        (
            "seed-003",
            "on process",
            "infrastruktur",
            now - Duration::days(95),
            "Jawa Timur",
            "Migrasi server daerah ke pusat data nasional.",
            vec![4, 2],
            vec![4],
        ),
    ];

    for (source_key, status, kategori, created_at, provinsi, uraian, unit_ids, topic_ids) in
        consultations
    {
        insert_consultation(
            pool,
            &NewConsultation {
                source_key: source_key.to_string(),
                status: status.to_string(),
                kategori: kategori.to_string(),
                created_at,
                asal_provinsi: Some(provinsi.to_string()),
                uraian_kebutuhan_konsultasi: Some(uraian.to_string()),
                unit_ids,
                topic_ids,
            },
        )
        .await?;
    }

    let superadmin = Uuid::parse_str("5b0c7d0e-8f4e-4c35-9d53-1d7f6f2c0a11")?;
    let layanan = Uuid::parse_str("a7e3c2b1-5d4f-4e6a-8b9c-0d1e2f3a4b5c")?;
    for (user_id, unit_id) in [(superadmin, 1), (layanan, 2)] {
        sqlx::query(
            r#"
            INSERT INTO klinik.user_units (user_id, unit_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(unit_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

struct NewConsultation {
    source_key: String,
    status: String,
    kategori: String,
    created_at: DateTime<Utc>,
    asal_provinsi: Option<String>,
    uraian_kebutuhan_konsultasi: Option<String>,
    unit_ids: Vec<i32>,
    topic_ids: Vec<i32>,
}

/// Returns false when the source key was already imported.
async fn insert_consultation(pool: &PgPool, new: &NewConsultation) -> anyhow::Result<bool> {
    // reject bad enum values before they reach the table
    new.status.parse::<Status>()?;
    new.kategori.parse::<Kategori>()?;

    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO klinik.konsultasi
        (status, kategori, created_at, asal_provinsi, uraian_kebutuhan_konsultasi, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&new.status)
    .bind(&new.kategori)
    .bind(new.created_at)
    .bind(&new.asal_provinsi)
    .bind(&new.uraian_kebutuhan_konsultasi)
    .bind(&new.source_key)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = inserted else {
        return Ok(false);
    };
    let konsultasi_id: i64 = row.get("id");

    for unit_id in &new.unit_ids {
        sqlx::query("INSERT INTO klinik.konsultasi_unit (konsultasi_id, unit_id) VALUES ($1, $2)")
            .bind(konsultasi_id)
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;
    }
    for topic_id in &new.topic_ids {
        sqlx::query(
            "INSERT INTO klinik.konsultasi_topik (konsultasi_id, topik_id) VALUES ($1, $2)",
        )
        .bind(konsultasi_id)
        .bind(topic_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

fn parse_required<T>(field: &'static str, value: Option<String>) -> Result<T, InvalidField>
where
    T: std::str::FromStr<Err = InvalidField>,
{
    match value {
        Some(value) => value.parse(),
        None => Err(InvalidField {
            field,
            value: "null".to_string(),
        }),
    }
}

/// Drops links whose consultation was rejected or no longer exists, so the
/// global topic stats count the same universe as every other stat.
fn retain_accepted_links(links: &mut Vec<TopicLink>, records: &[ConsultationRecord]) {
    let accepted: HashSet<i64> = records.iter().map(|record| record.id).collect();
    let before = links.len();
    links.retain(|link| accepted.contains(&link.konsultasi_id));
    if links.len() < before {
        warn!(
            dropped = before - links.len(),
            "ignoring topic links of rejected consultations"
        );
    }
}

pub async fn fetch_dataset(pool: &PgPool) -> anyhow::Result<Dataset> {
    let units: Vec<OrganizationalUnit> =
        sqlx::query("SELECT id, nama_unit FROM klinik.units ORDER BY id")
            .fetch_all(pool)
            .await
            .context("failed to load units")?
            .into_iter()
            .map(|row| OrganizationalUnit {
                id: row.get("id"),
                nama_unit: row.get("nama_unit"),
            })
            .collect();

    let mut unit_ids: HashMap<i64, Vec<i32>> = HashMap::new();
    for row in sqlx::query("SELECT konsultasi_id, unit_id FROM klinik.konsultasi_unit")
        .fetch_all(pool)
        .await
        .context("failed to load unit assignments")?
    {
        unit_ids
            .entry(row.get("konsultasi_id"))
            .or_default()
            .push(row.get("unit_id"));
    }

    let mut topic_links: Vec<TopicLink> = sqlx::query(
        r#"
        SELECT kt.konsultasi_id, t.nama_topik
        FROM klinik.konsultasi_topik kt
        LEFT JOIN klinik.topics t ON t.id = kt.topik_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to load topic assignments")?
    .into_iter()
    .map(|row| TopicLink {
        konsultasi_id: row.get("konsultasi_id"),
        nama_topik: row.get("nama_topik"),
    })
    .collect();

    let mut topics: HashMap<i64, Vec<Option<String>>> = HashMap::new();
    for link in &topic_links {
        topics
            .entry(link.konsultasi_id)
            .or_default()
            .push(link.nama_topik.clone());
    }

    let rows = sqlx::query(
        r#"
        SELECT id, status, kategori, created_at, asal_provinsi, uraian_kebutuhan_konsultasi
        FROM klinik.konsultasi
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to load consultations")?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.get("id");
        let parsed = parse_required::<Status>("status", row.get("status")).and_then(|status| {
            parse_required::<Kategori>("kategori", row.get("kategori"))
                .map(|kategori| (status, kategori))
        });
        let (status, kategori) = match parsed {
            Ok(fields) => fields,
            Err(err) => {
                warn!(konsultasi_id = id, error = %err, "rejecting consultation record");
                continue;
            }
        };

        records.push(ConsultationRecord {
            id,
            status,
            kategori,
            created_at: row.get("created_at"),
            asal_provinsi: row.get("asal_provinsi"),
            uraian_kebutuhan_konsultasi: row.get("uraian_kebutuhan_konsultasi"),
            unit_ids: unit_ids.remove(&id).unwrap_or_default(),
            topic_names: topics.remove(&id).unwrap_or_default(),
        });
    }
    retain_accepted_links(&mut topic_links, &records);

    info!(records = records.len(), "loaded consultation dataset");
    Ok(Dataset {
        records,
        units,
        topic_links,
    })
}

pub async fn fetch_user_unit_ids(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<i32>> {
    let rows = sqlx::query("SELECT unit_id FROM klinik.user_units WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("failed to load user units")?;
    Ok(rows.into_iter().map(|row| row.get("unit_id")).collect())
}

fn parse_id_list(raw: &str) -> anyhow::Result<Vec<i32>> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .with_context(|| format!("invalid id {part:?}"))
        })
        .collect()
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        status: String,
        kategori: String,
        created_at: DateTime<Utc>,
        asal_provinsi: Option<String>,
        uraian_kebutuhan_konsultasi: Option<String>,
        #[serde(default)]
        unit_ids: String,
        #[serde(default)]
        topic_ids: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let new = NewConsultation {
            source_key: row
                .source_key
                .unwrap_or_else(|| format!("import-{}", Uuid::new_v4())),
            status: row.status,
            kategori: row.kategori,
            created_at: row.created_at,
            asal_provinsi: row.asal_provinsi.filter(|value| !value.trim().is_empty()),
            uraian_kebutuhan_konsultasi: row
                .uraian_kebutuhan_konsultasi
                .filter(|value| !value.trim().is_empty()),
            unit_ids: parse_id_list(&row.unit_ids)?,
            topic_ids: parse_id_list(&row.topic_ids)?,
        };

        if insert_consultation(pool, &new)
            .await
            .with_context(|| format!("row {} of {}", line + 1, csv_path.display()))?
        {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsultationSource for PgSource {
    async fn load_dataset(&self) -> anyhow::Result<Dataset> {
        fetch_dataset(&self.pool).await
    }

    async fn unit_ids_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<i32>> {
        fetch_user_unit_ids(&self.pool, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_are_semicolon_separated() {
        assert_eq!(parse_id_list("2; 3;;4").unwrap(), vec![2, 3, 4]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("2;x").is_err());
    }

    #[test]
    fn null_enum_columns_are_rejected() {
        let err = parse_required::<Status>("status", None).unwrap_err();
        assert_eq!(err.to_string(), "invalid status value \"null\"");
        assert_eq!(
            parse_required::<Kategori>("kategori", Some("SDM".to_string())),
            Ok(Kategori::Sdm)
        );
    }

    #[test]
    fn topic_links_of_rejected_records_are_dropped() {
        let record = |id: i64| ConsultationRecord {
            id,
            status: Status::Done,
            kategori: Kategori::Aplikasi,
            created_at: Utc::now(),
            asal_provinsi: None,
            uraian_kebutuhan_konsultasi: None,
            unit_ids: Vec::new(),
            topic_names: vec![Some("Arsitektur SPBE".to_string())],
        };
        let link = |konsultasi_id: i64, name: Option<&str>| TopicLink {
            konsultasi_id,
            nama_topik: name.map(str::to_string),
        };
        // 2 had a null status, 9 was never loaded
        let mut links = vec![
            link(1, Some("Arsitektur SPBE")),
            link(2, Some("Arsitektur SPBE")),
            link(3, None),
            link(9, Some("Data Center")),
        ];

        retain_accepted_links(&mut links, &[record(1), record(3)]);

        assert_eq!(links, vec![link(1, Some("Arsitektur SPBE")), link(3, None)]);
    }
}
