use chrono::NaiveDate;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use super::CustomerStore;
use crate::{
    error::StoreError,
    models::{
        CustomerRecord, DateWindow, Garment, ListQuery, MeasurementKey, Measurements, Milestone,
        SortOrder, StatusFilter,
    },
    validation::ValidatedCustomer,
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl<'r> FromRow<'r, PgRow> for CustomerRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let labels: Option<Vec<String>> = row.try_get("selected_garments")?;
        let selected_garments = labels
            .unwrap_or_default()
            .iter()
            .filter_map(|label| match label.parse::<Garment>() {
                Ok(garment) => Some(garment),
                Err(err) => {
                    warn!("Skipping stored garment: {}", err);
                    None
                }
            })
            .collect();

        let mut measurements = Measurements::new();
        for key in MeasurementKey::all() {
            let value: Option<f64> = row.try_get(key.column().as_str())?;
            if let Some(value) = value {
                measurements
                    .insert(key.garment, key.field, value)
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
            }
        }

        Ok(CustomerRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            date: row.try_get("date")?,
            trial_date: row.try_get("trial_date")?,
            delivery_date: row.try_get("delivery_date")?,
            dob: row.try_get("dob")?,
            notes: row.try_get("notes")?,
            selected_garments,
            measurements,
            is_trialed: row.try_get("is_trialed")?,
            is_delivered: row.try_get("is_delivered")?,
            recorded_by: row.try_get("recorded_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Escapes `%`, `_` and `\` so user text only ever matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::NameTaken;
        }
    }
    StoreError::Database(err)
}

fn garment_labels(customer: &ValidatedCustomer) -> Vec<String> {
    customer
        .selected_garments()
        .iter()
        .map(|garment| garment.as_str().to_string())
        .collect()
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, window: DateWindow) {
    if let Some(from) = window.from {
        qb.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = window.to {
        qb.push(" AND date <= ").push_bind(to);
    }
}

fn push_list_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    let search = query.search.trim();
    if !search.is_empty() {
        qb.push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
    let phone = query.phone.trim();
    if !phone.is_empty() {
        qb.push(" AND phone ILIKE ")
            .push_bind(format!("%{}%", escape_like(phone)));
    }
    push_window(qb, query.window);
}

impl CustomerStore for PgStore {
    async fn insert(
        &self,
        customer: &ValidatedCustomer,
        recorded_by: Option<&str>,
    ) -> Result<CustomerRecord, StoreError> {
        let keys: Vec<MeasurementKey> = MeasurementKey::all().collect();

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO customers (name, phone, date, trial_date, delivery_date, dob, notes, \
             selected_garments, recorded_by",
        );
        for key in &keys {
            qb.push(", ").push(key.column());
        }
        qb.push(") VALUES (");
        {
            let mut values = qb.separated(", ");
            values
                .push_bind(customer.name().to_string())
                .push_bind(customer.phone().to_string())
                .push_bind(customer.date())
                .push_bind(customer.trial_date())
                .push_bind(customer.delivery_date())
                .push_bind(customer.dob())
                .push_bind(customer.notes().map(str::to_string))
                .push_bind(garment_labels(customer))
                .push_bind(recorded_by.map(str::to_string));
            for key in &keys {
                values.push_bind(customer.measurements().get_key(*key));
            }
        }
        qb.push(") RETURNING *");

        let record = qb
            .build_query_as::<CustomerRecord>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        debug!("Inserted customer {}", record.id);
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        customer: &ValidatedCustomer,
    ) -> Result<Option<CustomerRecord>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE customers SET name = ");
        qb.push_bind(customer.name().to_string())
            .push(", phone = ")
            .push_bind(customer.phone().to_string())
            .push(", date = ")
            .push_bind(customer.date())
            .push(", trial_date = ")
            .push_bind(customer.trial_date())
            .push(", delivery_date = ")
            .push_bind(customer.delivery_date())
            .push(", dob = ")
            .push_bind(customer.dob())
            .push(", notes = ")
            .push_bind(customer.notes().map(str::to_string))
            .push(", selected_garments = ")
            .push_bind(garment_labels(customer));
        for key in MeasurementKey::all() {
            qb.push(format!(", {} = ", key.column()))
                .push_bind(customer.measurements().get_key(key));
        }
        qb.push(", updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<CustomerRecord>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CustomerRecord>, StoreError> {
        let record = sqlx::query_as::<_, CustomerRecord>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<CustomerRecord>, i64), StoreError> {
        let direction = match query.sort {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM customers WHERE TRUE");
        push_list_filters(&mut qb, query);
        qb.push(format!(
            " ORDER BY date {dir}, delivery_date {dir}, created_at DESC LIMIT ",
            dir = direction
        ))
        .push_bind(i64::from(query.page_size))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let customers = qb
            .build_query_as::<CustomerRecord>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers WHERE TRUE");
        push_list_filters(&mut count_qb, query);
        let (count,): (i64,) = count_qb.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;

        Ok((customers, count))
    }

    async fn count(&self, window: DateWindow) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers WHERE TRUE");
        push_window(&mut qb, window);
        let (count,): (i64,) = qb.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<CustomerRecord>, StoreError> {
        let records = sqlx::query_as::<_, CustomerRecord>(
            "SELECT * FROM customers ORDER BY created_at DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn due_on(
        &self,
        milestone: Milestone,
        day: NaiveDate,
        status: StatusFilter,
    ) -> Result<Vec<CustomerRecord>, StoreError> {
        let flag = milestone.flag_column();
        let status_clause = match status {
            StatusFilter::All => String::new(),
            StatusFilter::Done => format!(" AND {} = TRUE", flag),
            StatusFilter::Pending => format!(" AND ({flag} IS NULL OR {flag} = FALSE)", flag = flag),
        };
        let sql = format!(
            "SELECT * FROM customers WHERE {} = $1{} ORDER BY name ASC",
            milestone.date_column(),
            status_clause
        );

        let records = sqlx::query_as::<_, CustomerRecord>(&sql)
            .bind(day)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn set_flag(
        &self,
        id: Uuid,
        milestone: Milestone,
        value: bool,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE customers SET {} = $1 WHERE id = $2",
            milestone.flag_column()
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn name_candidates(
        &self,
        base: &str,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM customers \
             WHERE name ILIKE $1 ESCAPE '\\' AND date = $2 AND ($3::uuid IS NULL OR id <> $3)",
        )
        .bind(format!("{}%", escape_like(base)))
        .bind(date)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn measurement_dates(&self, window: DateWindow) -> Result<Vec<NaiveDate>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT date FROM customers WHERE TRUE");
        push_window(&mut qb, window);
        qb.push(" ORDER BY date");
        let rows: Vec<(NaiveDate,)> = qb.build_query_as::<(NaiveDate,)>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(date,)| date).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("Rajesh"), "Rajesh");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
