use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{CustomerRecord, DateWindow, ListQuery, Milestone, StatusFilter},
    validation::ValidatedCustomer,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Table of customer records.
#[allow(async_fn_in_trait)]
pub trait CustomerStore {
    async fn insert(
        &self,
        customer: &ValidatedCustomer,
        recorded_by: Option<&str>,
    ) -> Result<CustomerRecord, StoreError>;

    /// Overwrites every editable field. `None` when the id is unknown.
    async fn update(
        &self,
        id: Uuid,
        customer: &ValidatedCustomer,
    ) -> Result<Option<CustomerRecord>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<CustomerRecord>, StoreError>;

    /// One page of matches plus the total number of matches.
    async fn list(&self, query: &ListQuery) -> Result<(Vec<CustomerRecord>, i64), StoreError>;

    async fn count(&self, window: DateWindow) -> Result<i64, StoreError>;

    async fn recent(&self, limit: u32) -> Result<Vec<CustomerRecord>, StoreError>;

    /// Records whose trial or delivery falls on `day`, by name.
    async fn due_on(
        &self,
        milestone: Milestone,
        day: NaiveDate,
        status: StatusFilter,
    ) -> Result<Vec<CustomerRecord>, StoreError>;

    async fn set_flag(&self, id: Uuid, milestone: Milestone, value: bool)
        -> Result<bool, StoreError>;

    /// Names starting with `base` (case-insensitive) measured on `date`.
    async fn name_candidates(
        &self,
        base: &str,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError>;

    async fn measurement_dates(&self, window: DateWindow) -> Result<Vec<NaiveDate>, StoreError>;
}

/// The backend picked at startup.
pub enum AnyStore {
    Postgres(PgStore),
    Memory(MemoryStore),
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            AnyStore::Postgres($store) => $call,
            AnyStore::Memory($store) => $call,
        }
    };
}

impl CustomerStore for AnyStore {
    async fn insert(
        &self,
        customer: &ValidatedCustomer,
        recorded_by: Option<&str>,
    ) -> Result<CustomerRecord, StoreError> {
        dispatch!(self, store => store.insert(customer, recorded_by).await)
    }

    async fn update(
        &self,
        id: Uuid,
        customer: &ValidatedCustomer,
    ) -> Result<Option<CustomerRecord>, StoreError> {
        dispatch!(self, store => store.update(id, customer).await)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        dispatch!(self, store => store.delete(id).await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CustomerRecord>, StoreError> {
        dispatch!(self, store => store.get(id).await)
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<CustomerRecord>, i64), StoreError> {
        dispatch!(self, store => store.list(query).await)
    }

    async fn count(&self, window: DateWindow) -> Result<i64, StoreError> {
        dispatch!(self, store => store.count(window).await)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<CustomerRecord>, StoreError> {
        dispatch!(self, store => store.recent(limit).await)
    }

    async fn due_on(
        &self,
        milestone: Milestone,
        day: NaiveDate,
        status: StatusFilter,
    ) -> Result<Vec<CustomerRecord>, StoreError> {
        dispatch!(self, store => store.due_on(milestone, day, status).await)
    }

    async fn set_flag(
        &self,
        id: Uuid,
        milestone: Milestone,
        value: bool,
    ) -> Result<bool, StoreError> {
        dispatch!(self, store => store.set_flag(id, milestone, value).await)
    }

    async fn name_candidates(
        &self,
        base: &str,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError> {
        dispatch!(self, store => store.name_candidates(base, date, exclude).await)
    }

    async fn measurement_dates(&self, window: DateWindow) -> Result<Vec<NaiveDate>, StoreError> {
        dispatch!(self, store => store.measurement_dates(window).await)
    }
}
