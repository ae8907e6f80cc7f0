use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use reserva_core::availability::{AvailabilityRule, RuleDetail, TimeWindow};
use reserva_core::error::{CoreError, CoreResult};
use reserva_core::repository::AvailabilityRepository;

use crate::database::db_err;

pub struct PgAvailabilityRepository {
    pool: PgPool,
}

impl PgAvailabilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    resource_id: Uuid,
    day_of_week: Option<i16>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    is_available: bool,
    exception_date: Option<NaiveDate>,
    is_blackout: bool,
}

impl RuleRow {
    fn into_domain(self) -> CoreResult<AvailabilityRule> {
        let window = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(TimeWindow { start, end }),
            (None, None) => None,
            _ => {
                return Err(CoreError::Store(format!(
                    "availability rule {} has a half-defined window",
                    self.id
                )))
            }
        };

        let detail = match self.exception_date {
            Some(date) => RuleDetail::Exception {
                date,
                window,
                is_blackout: self.is_blackout,
            },
            None => {
                let day_of_week = self.day_of_week.ok_or_else(|| {
                    CoreError::Store(format!(
                        "availability rule {} has neither a weekday nor an exception date",
                        self.id
                    ))
                })?;
                RuleDetail::Weekly {
                    day_of_week: day_of_week as u8,
                    window,
                    is_available: self.is_available,
                }
            }
        };

        Ok(AvailabilityRule {
            id: self.id,
            resource_id: self.resource_id,
            detail,
        })
    }
}

pub(crate) const RULE_COLUMNS: &str =
    "id, resource_id, day_of_week, start_time, end_time, is_available, exception_date, is_blackout";

/// Rule fetch usable inside another repository's transaction.
pub(crate) async fn fetch_rules_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    resource_id: Uuid,
) -> CoreResult<Vec<AvailabilityRule>> {
    let rows = sqlx::query_as::<Postgres, RuleRow>(&format!(
        "SELECT {RULE_COLUMNS} FROM availability_rules WHERE resource_id = $1"
    ))
    .bind(resource_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(db_err)?;

    rows.into_iter().map(RuleRow::into_domain).collect()
}

#[async_trait]
impl AvailabilityRepository for PgAvailabilityRepository {
    async fn add_rule(&self, rule: &AvailabilityRule) -> CoreResult<()> {
        let (day_of_week, window, is_available, exception_date, is_blackout) = match &rule.detail {
            RuleDetail::Weekly {
                day_of_week,
                window,
                is_available,
            } => (Some(*day_of_week as i16), *window, *is_available, None, false),
            RuleDetail::Exception {
                date,
                window,
                is_blackout,
            } => (None, *window, true, Some(*date), *is_blackout),
        };

        sqlx::query(
            r#"
            INSERT INTO availability_rules
                (id, resource_id, day_of_week, start_time, end_time, is_available, exception_date, is_blackout)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(rule.id)
        .bind(rule.resource_id)
        .bind(day_of_week)
        .bind(window.map(|w| w.start))
        .bind(window.map(|w| w.end))
        .bind(is_available)
        .bind(exception_date)
        .bind(is_blackout)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn rules_for_resource(&self, resource_id: Uuid) -> CoreResult<Vec<AvailabilityRule>> {
        let rows = sqlx::query_as::<Postgres, RuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM availability_rules \
             WHERE resource_id = $1 ORDER BY day_of_week, exception_date, start_time"
        ))
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(RuleRow::into_domain).collect()
    }
}
