use bill::BillSettings;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Utc};
use common::{service::CustomerService, store::AnyStore};

pub struct AppState {
    pub service: CustomerService<AnyStore>,
    pub bill: BillSettings,
    pub utc_offset: FixedOffset,
    pub page_size: u32,
}

impl AppState {
    /// Wall-clock time in the shop's timezone.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.utc_offset).naive_local()
    }

    /// "Today" for the date filters and dashboard.
    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}
