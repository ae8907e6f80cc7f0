use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use reserva_core::error::{CoreError, CoreResult};
use reserva_core::repository::{ResourceFilter, ResourceRepository};
use reserva_core::resource::{Resource, ResourceKind};

use crate::database::db_err;

pub struct PgResourceRepository {
    pool: PgPool,
}

impl PgResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ResourceRow {
    id: Uuid,
    name: String,
    kind: String,
    location: String,
    capacity: Option<i32>,
    description: Option<String>,
    image_url: Option<String>,
    is_blocked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceRow {
    fn into_domain(self) -> CoreResult<Resource> {
        Ok(Resource {
            id: self.id,
            name: self.name,
            kind: ResourceKind::parse(&self.kind)?,
            location: self.location,
            capacity: self.capacity,
            description: self.description,
            image_url: self.image_url,
            is_blocked: self.is_blocked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, name, kind, location, capacity, description, image_url, \
     is_blocked, created_at, updated_at";

/// Resource fetch usable inside another repository's transaction.
pub(crate) async fn fetch_resource_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: Uuid,
) -> CoreResult<Option<Resource>> {
    let row = sqlx::query_as::<Postgres, ResourceRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM resources WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?;

    row.map(ResourceRow::into_domain).transpose()
}

#[async_trait]
impl ResourceRepository for PgResourceRepository {
    async fn create(&self, resource: &Resource) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO resources (id, name, kind, location, capacity, description, image_url, is_blocked, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(resource.id)
        .bind(&resource.name)
        .bind(resource.kind.as_str())
        .bind(&resource.location)
        .bind(resource.capacity)
        .bind(&resource.description)
        .bind(&resource.image_url)
        .bind(resource.is_blocked)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        info!("Resource created: {}", resource.id);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<Resource>> {
        let row = sqlx::query_as::<Postgres, ResourceRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM resources WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(ResourceRow::into_domain).transpose()
    }

    async fn list(&self, filter: &ResourceFilter) -> CoreResult<Vec<Resource>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM resources WHERE 1=1"
        ));

        if let Some(kind) = filter.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(location) = &filter.location {
            builder
                .push(" AND location ILIKE ")
                .push_bind(format!("%{location}%"));
        }
        if let Some(search) = &filter.search {
            let term = format!("%{search}%");
            builder
                .push(" AND (name ILIKE ")
                .push_bind(term.clone())
                .push(" OR description ILIKE ")
                .push_bind(term)
                .push(")");
        }
        builder.push(" ORDER BY kind, name");

        let rows: Vec<ResourceRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(ResourceRow::into_domain).collect()
    }

    async fn update(&self, resource: &Resource) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE resources
            SET name = $2, kind = $3, location = $4, capacity = $5,
                description = $6, image_url = $7, is_blocked = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(resource.id)
        .bind(&resource.name)
        .bind(resource.kind.as_str())
        .bind(&resource.location)
        .bind(resource.capacity)
        .bind(&resource.description)
        .bind(&resource.image_url)
        .bind(resource.is_blocked)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() < 1 {
            return Err(CoreError::NotFound("resource".to_string()));
        }
        Ok(())
    }

    async fn set_blocked(&self, id: Uuid, is_blocked: bool) -> CoreResult<Resource> {
        let row = sqlx::query_as::<Postgres, ResourceRow>(&format!(
            "UPDATE resources SET is_blocked = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(is_blocked)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let resource = row
            .ok_or_else(|| CoreError::NotFound("resource".to_string()))?
            .into_domain()?;
        info!(
            "Resource {} {}",
            id,
            if is_blocked { "blocked" } else { "unblocked" }
        );
        Ok(resource)
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings \
             WHERE resource_id = $1 AND status IN ('pending', 'approved')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        if active > 0 {
            return Err(CoreError::Validation(
                "cannot delete resource with active bookings".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() < 1 {
            return Err(CoreError::NotFound("resource".to_string()));
        }

        tx.commit().await.map_err(db_err)?;
        info!("Resource deleted: {}", id);
        Ok(())
    }
}
