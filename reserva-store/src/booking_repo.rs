use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use reserva_core::admission;
use reserva_core::booking::{Booking, BookingStatus, LifecycleEvent};
use reserva_core::error::{CoreError, CoreResult};
use reserva_core::identity::Actor;
use reserva_core::policy::BookingPolicy;
use reserva_core::repository::{
    AdminBookingFilter, BookingFilter, BookingPatch, BookingRepository, NewBooking,
};
use reserva_core::slot::Slot;

use crate::availability_repo::fetch_rules_tx;
use crate::database::{db_err, set_serializable};
use crate::resource_repo::fetch_resource_tx;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    resource_id: Uuid,
    booking_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    purpose: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_domain(self) -> CoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            resource_id: self.resource_id,
            date: self.booking_date,
            start_time: self.start_time,
            end_time: self.end_time,
            purpose: self.purpose,
            status: BookingStatus::parse(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, resource_id, booking_date, start_time, end_time, \
     purpose, status, created_at, updated_at";

/// Active bookings for one resource/date, fetched inside the admission
/// transaction so the conflict check and the write are isolated together.
async fn fetch_active_for_day_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    resource_id: Uuid,
    date: NaiveDate,
) -> CoreResult<Vec<Booking>> {
    let rows = sqlx::query_as::<Postgres, BookingRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM bookings \
         WHERE resource_id = $1 AND booking_date = $2 \
           AND status IN ('pending', 'approved') \
         ORDER BY start_time"
    ))
    .bind(resource_id)
    .bind(date)
    .fetch_all(&mut **tx)
    .await
    .map_err(db_err)?;

    rows.into_iter().map(BookingRow::into_domain).collect()
}

async fn fetch_booking_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: Uuid,
) -> CoreResult<Option<Booking>> {
    let row = sqlx::query_as::<Postgres, BookingRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?;

    row.map(BookingRow::into_domain).transpose()
}

/// Locks the row so concurrent transitions serialize; the later one
/// re-reads the committed status and the state machine rejects it.
async fn fetch_booking_for_update_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: Uuid,
) -> CoreResult<Option<Booking>> {
    let row = sqlx::query_as::<Postgres, BookingRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?;

    row.map(BookingRow::into_domain).transpose()
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create(&self, request: NewBooking, policy: &BookingPolicy) -> CoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        set_serializable(&mut tx).await?;

        let resource = fetch_resource_tx(&mut tx, request.resource_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("resource".to_string()))?;
        let rules = fetch_rules_tx(&mut tx, request.resource_id).await?;
        let existing =
            fetch_active_for_day_tx(&mut tx, request.resource_id, request.slot.date).await?;

        let status = admission::admit(&resource, &rules, &existing, &request.slot, None, policy)?;

        let booking = Booking::new(
            request.user_id,
            request.resource_id,
            request.slot,
            request.purpose,
            status,
        );

        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, user_id, resource_id, booking_date, start_time, end_time, purpose, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.resource_id)
        .bind(booking.date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(&booking.purpose)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        info!(
            "Booking created: {} ({} on {} {}-{})",
            booking.id, booking.resource_id, booking.date, booking.start_time, booking.end_time
        );
        Ok(booking)
    }

    async fn find(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<Postgres, BookingRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(BookingRow::into_domain).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
    ) -> CoreResult<Vec<Booking>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM bookings WHERE user_id = "
        ));
        builder.push_bind(user_id);

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if filter.upcoming {
            let now = Utc::now();
            let today = now.date_naive();
            let time = now.time();
            builder
                .push(" AND (booking_date > ")
                .push_bind(today)
                .push(" OR (booking_date = ")
                .push_bind(today)
                .push(" AND end_time > ")
                .push_bind(time)
                .push("))");
        }
        builder.push(" ORDER BY booking_date DESC, start_time DESC");

        let rows: Vec<BookingRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    async fn list_all(&self, filter: &AdminBookingFilter) -> CoreResult<Vec<Booking>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SELECT_COLUMNS} FROM bookings WHERE 1=1"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(resource_id) = filter.resource_id {
            builder.push(" AND resource_id = ").push_bind(resource_id);
        }
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(from) = filter.date_from {
            builder.push(" AND booking_date >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            builder.push(" AND booking_date <= ").push_bind(to);
        }
        builder.push(" ORDER BY booking_date DESC, start_time DESC");

        let rows: Vec<BookingRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    async fn active_for_day(
        &self,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<Postgres, BookingRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM bookings \
             WHERE resource_id = $1 AND booking_date = $2 \
               AND status IN ('pending', 'approved') \
             ORDER BY start_time"
        ))
        .bind(resource_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    async fn update(
        &self,
        id: Uuid,
        actor: &Actor,
        patch: BookingPatch,
        policy: &BookingPolicy,
    ) -> CoreResult<Booking> {
        if patch.is_empty() {
            return Err(CoreError::Validation("no fields to update".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        set_serializable(&mut tx).await?;

        let mut booking = fetch_booking_tx(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::NotFound("booking".to_string()))?;

        booking.ensure_editable(actor)?;

        if patch.changes_schedule() {
            let slot = Slot::new(
                patch.date.unwrap_or(booking.date),
                patch.start_time.unwrap_or(booking.start_time),
                patch.end_time.unwrap_or(booking.end_time),
            )?;

            let resource = fetch_resource_tx(&mut tx, booking.resource_id)
                .await?
                .ok_or_else(|| CoreError::NotFound("resource".to_string()))?;
            let rules = fetch_rules_tx(&mut tx, booking.resource_id).await?;
            let existing =
                fetch_active_for_day_tx(&mut tx, booking.resource_id, slot.date).await?;

            // Re-admit the new window, ignoring this booking's own row.
            // The assigned initial status is irrelevant here; the booking
            // keeps its current one.
            admission::admit(&resource, &rules, &existing, &slot, Some(booking.id), policy)?;

            booking.reschedule(slot);
        }

        if let Some(purpose) = patch.purpose {
            booking.set_purpose(purpose);
        }

        sqlx::query(
            r#"
            UPDATE bookings
            SET booking_date = $2, start_time = $3, end_time = $4, purpose = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(&booking.purpose)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        info!("Booking updated: {}", booking.id);
        Ok(booking)
    }

    async fn transition(
        &self,
        id: Uuid,
        actor: &Actor,
        event: LifecycleEvent,
    ) -> CoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut booking = fetch_booking_for_update_tx(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::NotFound("booking".to_string()))?;

        booking.apply(event, actor)?;

        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(booking.id)
            .bind(booking.status.as_str())
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        info!("Booking {} is now {}", booking.id, booking.status);
        Ok(booking)
    }
}
