use anyhow::Context;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::config::Config;
use crate::dataset::{DatasetKind, DatasetRef, Source};
use crate::error::Result;
use crate::models::{FinalsRecord, GradesRecord, Record};
use crate::pipeline::{GroupRow, Pipeline};
use crate::search::Filter;
use crate::store::RecordStore;

/// Postgres-backed record store with one pool per source.
pub struct PgStore {
    primary: PgPool,
    archive: PgPool,
    shared: bool,
}

impl PgStore {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let primary = connect_pool(&config.primary_url, config.max_connections)
            .await
            .context("failed to connect to the primary Postgres source")?;

        let shared = config.archive_url() == config.primary_url;
        let archive = if shared {
            primary.clone()
        } else {
            connect_pool(config.archive_url(), config.max_connections)
                .await
                .context("failed to connect to the archive Postgres source")?
        };

        Ok(Self {
            primary,
            archive,
            shared,
        })
    }

    pub fn pool(&self, source: Source) -> &PgPool {
        match source {
            Source::Primary => &self.primary,
            Source::Archive => &self.archive,
        }
    }

    /// Each distinct database once, primary first.
    fn distinct_pools(&self) -> Vec<(Source, &PgPool)> {
        let mut pools = vec![(Source::Primary, &self.primary)];
        if !self.shared {
            pools.push((Source::Archive, &self.archive));
        }
        pools
    }
}

async fn connect_pool(url: &str, max_connections: u32) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

pub async fn init_db(store: &PgStore) -> anyhow::Result<()> {
    for (source, pool) in store.distinct_pools() {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .with_context(|| format!("failed to migrate the {source} source"))?;
        log::info!("schema ready on {source} source");
    }
    Ok(())
}

fn grades_from_row(row: &PgRow) -> std::result::Result<GradesRecord, sqlx::Error> {
    Ok(GradesRecord {
        nationality: row.try_get("nationality")?,
        avg: row.try_get("avg")?,
        school_name: row.try_get("school_name")?,
        short_school_name: row.try_get("short_school_name")?,
    })
}

fn finals_from_row(row: &PgRow) -> std::result::Result<FinalsRecord, sqlx::Error> {
    Ok(FinalsRecord {
        full_school_name: row.try_get("full_school_name")?,
        nationality: row.try_get("nationality")?,
        romanian_grade_final: row.try_get("romanian_grade_final")?,
        mandatory_grade_final: row.try_get("mandatory_grade_final")?,
        chosen_grade_final: row.try_get("chosen_grade_final")?,
        school: row.try_get("school")?,
        code: row.try_get("code")?,
    })
}

impl RecordStore for PgStore {
    async fn find(&self, dataset: &DatasetRef, filter: &Filter) -> Result<Vec<Record>> {
        let (clause, pattern) = filter.to_sql();
        let sql = format!("SELECT * FROM {}{} ORDER BY row_no", dataset.table(), clause);
        log::debug!("find on {dataset}: {sql}");

        let mut query = sqlx::query(&sql);
        if let Some(pattern) = pattern {
            query = query.bind(pattern);
        }
        let rows = query.fetch_all(self.pool(dataset.source)).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(match dataset.kind {
                DatasetKind::Grades => Record::Grades(grades_from_row(row)?),
                DatasetKind::Finals => Record::Finals(finals_from_row(row)?),
            });
        }

        log::info!("find on {dataset} returned {} records", records.len());
        Ok(records)
    }

    async fn aggregate(&self, dataset: &DatasetRef, pipeline: &Pipeline) -> Result<Vec<GroupRow>> {
        let sql = pipeline.to_sql(dataset);
        log::debug!("aggregate on {dataset}: {sql}");

        let rows = sqlx::query(&sql)
            .bind(pipeline.limit.map(|limit| limit as i64))
            .fetch_all(self.pool(dataset.source))
            .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(GroupRow {
                key: row.try_get("group_key")?,
                avg_score: row.try_get("avg_score")?,
                count: row.try_get("member_count")?,
            });
        }

        log::info!("aggregate on {dataset} returned {} groups", groups.len());
        Ok(groups)
    }
}

/// Loads a CSV export of one dataset into its table in a single transaction.
/// Headers use the stored document field names; missing columns load as NULL.
pub async fn import_csv(
    store: &PgStore,
    dataset: &DatasetRef,
    csv_path: &std::path::Path,
    replace: bool,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let table = dataset.table();
    let mut tx = store.pool(dataset.source).begin().await?;

    if replace {
        sqlx::query(&format!("TRUNCATE {table} RESTART IDENTITY"))
            .execute(&mut *tx)
            .await?;
        log::info!("cleared {dataset} before import");
    }

    let mut inserted = 0usize;
    match dataset.kind {
        DatasetKind::Grades => {
            let sql = format!(
                "INSERT INTO {table} (nationality, avg, school_name, short_school_name) \
                 VALUES ($1, $2, $3, $4)"
            );
            for result in reader.deserialize::<GradesRecord>() {
                let row = result.with_context(|| format!("bad row {}", inserted + 1))?;
                sqlx::query(&sql)
                    .bind(row.nationality)
                    .bind(row.avg)
                    .bind(row.school_name)
                    .bind(row.short_school_name)
                    .execute(&mut *tx)
                    .await?;
                inserted += 1;
            }
        }
        DatasetKind::Finals => {
            let sql = format!(
                r#"
                INSERT INTO {table}
                (full_school_name, nationality, romanian_grade_final,
                 mandatory_grade_final, chosen_grade_final, school, code)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#
            );
            for result in reader.deserialize::<FinalsRecord>() {
                let row = result.with_context(|| format!("bad row {}", inserted + 1))?;
                sqlx::query(&sql)
                    .bind(row.full_school_name)
                    .bind(row.nationality)
                    .bind(row.romanian_grade_final)
                    .bind(row.mandatory_grade_final)
                    .bind(row.chosen_grade_final)
                    .bind(row.school)
                    .bind(row.code)
                    .execute(&mut *tx)
                    .await?;
                inserted += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(inserted)
}
