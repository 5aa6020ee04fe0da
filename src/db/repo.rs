use super::model::{ImageRecord, NewImageRecord, Report, SlotRecord};
use crate::model::{Address, PropertySnapshot, SlotKind};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, ensure the parent directory exists. Leaves
/// in-memory URLs and other schemes untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let path_part = path_with_query
        .split_once('?')
        .map(|(p, _)| p)
        .unwrap_or(path_with_query);

    if let Some(parent) = std::path::Path::new(path_part).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    url.to_string()
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_property(pool: &Pool, snapshot: &PropertySnapshot) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO properties (id, title, property_type, price, bedrooms, bathrooms, \
         square_feet, year_built, street, city, state, zip_code, features, amenities) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&snapshot.title)
    .bind(&snapshot.property_type)
    .bind(snapshot.price)
    .bind(snapshot.bedrooms as i64)
    .bind(snapshot.bathrooms)
    .bind(snapshot.square_feet as i64)
    .bind(snapshot.year_built as i64)
    .bind(&snapshot.address.street)
    .bind(&snapshot.address.city)
    .bind(&snapshot.address.state)
    .bind(&snapshot.address.zip_code)
    .bind(serde_json::to_string(&snapshot.features)?)
    .bind(serde_json::to_string(&snapshot.amenities)?)
    .execute(pool)
    .await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn fetch_property_snapshot(pool: &Pool, property_id: Uuid) -> Result<PropertySnapshot> {
    let row = sqlx::query(
        "SELECT title, property_type, price, bedrooms, bathrooms, square_feet, year_built, \
         street, city, state, zip_code, features, amenities FROM properties WHERE id = ?",
    )
    .bind(property_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(anyhow!("property {} not found", property_id));
    };

    let features: Vec<String> = serde_json::from_str(row.get::<String, _>("features").as_str())
        .context("invalid features JSON")?;
    let amenities: Vec<String> = serde_json::from_str(row.get::<String, _>("amenities").as_str())
        .context("invalid amenities JSON")?;

    Ok(PropertySnapshot {
        title: row.get("title"),
        property_type: row.get("property_type"),
        price: row.get("price"),
        bedrooms: row.get::<i64, _>("bedrooms") as u32,
        bathrooms: row.get("bathrooms"),
        square_feet: row.get::<i64, _>("square_feet") as u32,
        year_built: row.get::<i64, _>("year_built") as i32,
        address: Address {
            street: row.get("street"),
            city: row.get("city"),
            state: row.get("state"),
            zip_code: row.get("zip_code"),
        },
        features,
        amenities,
    })
}

#[instrument(skip_all)]
pub async fn create_report(
    pool: &Pool,
    property_id: Uuid,
    valuation: Option<f64>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO reports (id, property_id, valuation) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(property_id.to_string())
        .bind(valuation)
        .execute(pool)
        .await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn fetch_report(pool: &Pool, report_id: Uuid) -> Result<Report> {
    let row = sqlx::query(
        "SELECT id, property_id, valuation, created_at FROM reports WHERE id = ?",
    )
    .bind(report_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(anyhow!("report {} not found", report_id));
    };

    Ok(Report {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        property_id: parse_uuid(&row.get::<String, _>("property_id"))?,
        valuation: row.try_get("valuation").ok(),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

/// Insert one row per newly committed image. All rows go in one
/// transaction: the caller treats a store failure as affecting every image
/// of the batch.
#[instrument(skip_all)]
pub async fn insert_images(
    pool: &Pool,
    property_id: Uuid,
    records: &[NewImageRecord],
) -> Result<Vec<Uuid>> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO property_images (id, property_id, url, is_primary, position) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(property_id.to_string())
        .bind(&record.url)
        .bind(record.is_primary)
        .bind(record.position)
        .execute(&mut *tx)
        .await?;
        ids.push(id);
    }
    tx.commit().await?;
    Ok(ids)
}

#[instrument(skip_all)]
pub async fn list_images(pool: &Pool, property_id: Uuid) -> Result<Vec<ImageRecord>> {
    let rows = sqlx::query(
        "SELECT id, property_id, url, is_primary, position, created_at \
         FROM property_images WHERE property_id = ? ORDER BY position ASC",
    )
    .bind(property_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ImageRecord {
                id: parse_uuid(&row.get::<String, _>("id"))?,
                property_id: parse_uuid(&row.get::<String, _>("property_id"))?,
                url: row.get("url"),
                is_primary: row.get("is_primary"),
                position: row.get("position"),
                created_at: row.get::<DateTime<Utc>, _>("created_at"),
            })
        })
        .collect()
}

/// Delete a persisted image. If it was the primary, the first remaining
/// image by position takes over the flag, mirroring the in-memory rule.
#[instrument(skip_all)]
pub async fn delete_image(pool: &Pool, property_id: Uuid, image_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;

    let was_primary: Option<bool> =
        sqlx::query_scalar("SELECT is_primary FROM property_images WHERE id = ? AND property_id = ?")
            .bind(image_id.to_string())
            .bind(property_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
    let Some(was_primary) = was_primary else {
        return Err(anyhow!("image {} not found", image_id));
    };

    sqlx::query("DELETE FROM property_images WHERE id = ?")
        .bind(image_id.to_string())
        .execute(&mut *tx)
        .await?;

    if was_primary {
        sqlx::query(
            "UPDATE property_images SET is_primary = 1 WHERE id = \
             (SELECT id FROM property_images WHERE property_id = ? ORDER BY position ASC LIMIT 1)",
        )
        .bind(property_id.to_string())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Persisted counterpart of `curator::set_primary`: exactly one image of
/// the property carries the flag afterwards.
#[instrument(skip_all)]
pub async fn mark_primary(pool: &Pool, property_id: Uuid, image_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE property_images SET is_primary = 0 WHERE property_id = ?")
        .bind(property_id.to_string())
        .execute(&mut *tx)
        .await?;
    let updated = sqlx::query(
        "UPDATE property_images SET is_primary = 1 WHERE id = ? AND property_id = ?",
    )
    .bind(image_id.to_string())
    .bind(property_id.to_string())
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(anyhow!("image {} not found", image_id));
    }
    tx.commit().await?;
    Ok(())
}

/// Upsert the `(text, provenance)` of one report section.
#[instrument(skip_all)]
pub async fn write_slot(
    pool: &Pool,
    report_id: Uuid,
    kind: SlotKind,
    text: &str,
    provenance: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO report_sections (report_id, kind, text, provenance, updated_at) \
         VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP) \
         ON CONFLICT (report_id, kind) DO UPDATE SET \
         text = excluded.text, provenance = excluded.provenance, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(report_id.to_string())
    .bind(kind.as_str())
    .bind(text)
    .bind(provenance)
    .execute(pool)
    .await
    .context("failed to persist report section")?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn read_slot(
    pool: &Pool,
    report_id: Uuid,
    kind: SlotKind,
) -> Result<Option<SlotRecord>> {
    let row = sqlx::query(
        "SELECT text, provenance, updated_at FROM report_sections \
         WHERE report_id = ? AND kind = ?",
    )
    .bind(report_id.to_string())
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SlotRecord {
        text: row.get("text"),
        provenance: row.get("provenance"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("invalid uuid in store: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn sample_snapshot() -> PropertySnapshot {
        PropertySnapshot {
            title: "Loft 3B".into(),
            property_type: "Condominium".into(),
            price: 310_000.0,
            bedrooms: 2,
            bathrooms: 2.0,
            square_feet: 1_050,
            year_built: 2010,
            address: Address {
                street: "8 Dock St".into(),
                city: "Portland".into(),
                state: "ME".into(),
                zip_code: "04101".into(),
            },
            features: vec!["High Ceilings".into()],
            amenities: vec!["Gym/Fitness Center".into(), "Parking".into()],
        }
    }

    #[tokio::test]
    async fn property_snapshot_round_trips() {
        let pool = setup_pool().await;
        let id = insert_property(&pool, &sample_snapshot()).await.unwrap();
        let fetched = fetch_property_snapshot(&pool, id).await.unwrap();
        assert_eq!(fetched, sample_snapshot());
    }

    #[tokio::test]
    async fn fetch_missing_property_fails() {
        let pool = setup_pool().await;
        assert!(fetch_property_snapshot(&pool, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn image_records_keep_order_and_primary_flag() {
        let pool = setup_pool().await;
        let property_id = insert_property(&pool, &sample_snapshot()).await.unwrap();
        let records = vec![
            NewImageRecord {
                url: "https://cdn/front.jpg".into(),
                is_primary: true,
                position: 0,
            },
            NewImageRecord {
                url: "https://cdn/back.jpg".into(),
                is_primary: false,
                position: 1,
            },
        ];
        let ids = insert_images(&pool, property_id, &records).await.unwrap();
        assert_eq!(ids.len(), 2);

        let listed = list_images(&pool, property_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].is_primary);
        assert_eq!(listed[0].url, "https://cdn/front.jpg");
        assert_eq!(listed[1].position, 1);
    }

    #[tokio::test]
    async fn deleting_primary_promotes_first_remaining() {
        let pool = setup_pool().await;
        let property_id = insert_property(&pool, &sample_snapshot()).await.unwrap();
        let ids = insert_images(
            &pool,
            property_id,
            &[
                NewImageRecord {
                    url: "u0".into(),
                    is_primary: true,
                    position: 0,
                },
                NewImageRecord {
                    url: "u1".into(),
                    is_primary: false,
                    position: 1,
                },
            ],
        )
        .await
        .unwrap();

        delete_image(&pool, property_id, ids[0]).await.unwrap();
        let listed = list_images(&pool, property_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_primary);
        assert_eq!(listed[0].url, "u1");
    }

    #[tokio::test]
    async fn mark_primary_moves_the_flag() {
        let pool = setup_pool().await;
        let property_id = insert_property(&pool, &sample_snapshot()).await.unwrap();
        let ids = insert_images(
            &pool,
            property_id,
            &[
                NewImageRecord {
                    url: "u0".into(),
                    is_primary: true,
                    position: 0,
                },
                NewImageRecord {
                    url: "u1".into(),
                    is_primary: false,
                    position: 1,
                },
            ],
        )
        .await
        .unwrap();

        mark_primary(&pool, property_id, ids[1]).await.unwrap();
        let listed = list_images(&pool, property_id).await.unwrap();
        assert!(!listed[0].is_primary);
        assert!(listed[1].is_primary);
    }

    #[tokio::test]
    async fn slot_upsert_overwrites_previous_value() {
        let pool = setup_pool().await;
        let property_id = insert_property(&pool, &sample_snapshot()).await.unwrap();
        let report_id = create_report(&pool, property_id, Some(320_000.0))
            .await
            .unwrap();

        write_slot(&pool, report_id, SlotKind::Description, "v1", "generated")
            .await
            .unwrap();
        write_slot(&pool, report_id, SlotKind::Description, "v2", "edited")
            .await
            .unwrap();

        let row = read_slot(&pool, report_id, SlotKind::Description)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.text, "v2");
        assert_eq!(row.provenance, "edited");

        assert!(read_slot(&pool, report_id, SlotKind::MarketAnalysis)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn report_round_trips() {
        let pool = setup_pool().await;
        let property_id = insert_property(&pool, &sample_snapshot()).await.unwrap();
        let report_id = create_report(&pool, property_id, Some(500_000.0))
            .await
            .unwrap();
        let report = fetch_report(&pool, report_id).await.unwrap();
        assert_eq!(report.property_id, property_id);
        assert_eq!(report.valuation, Some(500_000.0));
    }
}
