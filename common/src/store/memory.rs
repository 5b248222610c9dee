use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::CustomerStore;
use crate::{
    error::StoreError,
    models::{CustomerRecord, DateWindow, ListQuery, Milestone, SortOrder, StatusFilter},
    validation::ValidatedCustomer,
};

/// Process-local store with the same query semantics and uniqueness
/// backstop as [`super::PgStore`]. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<CustomerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn name_taken(records: &[CustomerRecord], name: &str, date: NaiveDate, skip: Option<Uuid>) -> bool {
    let name = name.to_lowercase();
    records.iter().any(|record| {
        Some(record.id) != skip && record.date == date && record.name.to_lowercase() == name
    })
}

fn apply(record: &mut CustomerRecord, customer: &ValidatedCustomer) {
    record.name = customer.name().to_string();
    record.phone = customer.phone().to_string();
    record.date = customer.date();
    record.trial_date = customer.trial_date();
    record.delivery_date = customer.delivery_date();
    record.dob = customer.dob();
    record.notes = customer.notes().map(str::to_string);
    record.selected_garments = customer.selected_garments().to_vec();
    record.measurements = customer.measurements().clone();
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first(records: &[CustomerRecord]) -> Vec<CustomerRecord> {
    let mut sorted: Vec<CustomerRecord> = records.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

impl CustomerStore for MemoryStore {
    async fn insert(
        &self,
        customer: &ValidatedCustomer,
        recorded_by: Option<&str>,
    ) -> Result<CustomerRecord, StoreError> {
        let mut records = self.records.write().await;
        if name_taken(&records, customer.name(), customer.date(), None) {
            return Err(StoreError::NameTaken);
        }

        let now = Utc::now();
        let mut record = CustomerRecord {
            id: Uuid::new_v4(),
            name: String::new(),
            phone: String::new(),
            date: customer.date(),
            trial_date: customer.trial_date(),
            delivery_date: customer.delivery_date(),
            dob: None,
            notes: None,
            selected_garments: Vec::new(),
            measurements: Default::default(),
            is_trialed: None,
            is_delivered: None,
            recorded_by: recorded_by.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        apply(&mut record, customer);
        records.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        customer: &ValidatedCustomer,
    ) -> Result<Option<CustomerRecord>, StoreError> {
        let mut records = self.records.write().await;
        if name_taken(&records, customer.name(), customer.date(), Some(id)) {
            return Err(StoreError::NameTaken);
        }
        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            return Ok(None);
        };
        apply(record, customer);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() < before)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CustomerRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.id == id).cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<CustomerRecord>, i64), StoreError> {
        let records = self.records.read().await;
        let search = query.search.trim();
        let phone = query.phone.trim();

        let mut matches: Vec<CustomerRecord> = newest_first(&records)
            .into_iter()
            .filter(|record| search.is_empty() || contains_ignore_case(&record.name, search))
            .filter(|record| phone.is_empty() || contains_ignore_case(&record.phone, phone))
            .filter(|record| query.window.contains(record.date))
            .collect();

        matches.sort_by(|a, b| {
            let ordering = a
                .date
                .cmp(&b.date)
                .then_with(|| a.delivery_date.cmp(&b.delivery_date));
            match query.sort {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let count = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.page_size as usize)
            .collect();
        Ok((page, count))
    }

    async fn count(&self, window: DateWindow) -> Result<i64, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|record| window.contains(record.date)).count() as i64)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<CustomerRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(newest_first(&records)
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn due_on(
        &self,
        milestone: Milestone,
        day: NaiveDate,
        status: StatusFilter,
    ) -> Result<Vec<CustomerRecord>, StoreError> {
        let records = self.records.read().await;
        let mut due: Vec<CustomerRecord> = records
            .iter()
            .filter(|record| record.milestone_date(milestone) == day)
            .filter(|record| status.matches(record.milestone_done(milestone)))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(due)
    }

    async fn set_flag(
        &self,
        id: Uuid,
        milestone: Milestone,
        value: bool,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            return Ok(false);
        };
        match milestone {
            Milestone::Trial => record.is_trialed = Some(value),
            Milestone::Delivery => record.is_delivered = Some(value),
        }
        Ok(true)
    }

    async fn name_candidates(
        &self,
        base: &str,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError> {
        let base = base.to_lowercase();
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| Some(record.id) != exclude && record.date == date)
            .filter(|record| record.name.to_lowercase().starts_with(&base))
            .map(|record| record.name.clone())
            .collect())
    }

    async fn measurement_dates(&self, window: DateWindow) -> Result<Vec<NaiveDate>, StoreError> {
        let records = self.records.read().await;
        let mut dates: Vec<NaiveDate> = records
            .iter()
            .map(|record| record.date)
            .filter(|&date| window.contains(date))
            .collect();
        dates.sort();
        Ok(dates)
    }
}
