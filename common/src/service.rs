use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{Action, ServiceError, StoreError},
    measurement::{self, FractionalParts, RawMeasurement},
    models::{
        ChartBucket, Completeness, CustomerPage, CustomerRecord, DashboardStats, DateFilter,
        Garment, InboxItem, InboxKind, ListQuery, MeasurementField, Milestone, Statistics,
        StatisticsRange, StatusFilter,
    },
    naming,
    store::CustomerStore,
    validation::{CustomerForm, ValidatedCustomer},
};

const MAX_PAGE_SIZE: u32 = 100;
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn failed(action: Action) -> impl FnOnce(StoreError) -> ServiceError {
    move |source| {
        error!("{:?} failed: {}", action, source);
        ServiceError::Persistence { action, source }
    }
}

/// A form prefilled from a stored record, with every measurement encoded
/// for display and split for the whole / fraction inputs.
#[derive(Debug, Clone, Serialize)]
pub struct EditableForm {
    #[serde(flatten)]
    pub form: CustomerForm,
    pub editing: BTreeMap<Garment, BTreeMap<MeasurementField, FractionalParts>>,
    pub completeness: BTreeMap<Garment, Completeness>,
}

impl EditableForm {
    fn from_record(record: &CustomerRecord) -> Self {
        let mut measurements: BTreeMap<Garment, BTreeMap<MeasurementField, Option<RawMeasurement>>> =
            BTreeMap::new();
        let mut editing: BTreeMap<Garment, BTreeMap<MeasurementField, FractionalParts>> =
            BTreeMap::new();

        for (key, value) in record.measurements.iter() {
            let shown = measurement::encode_decimal(value);
            editing
                .entry(key.garment)
                .or_default()
                .insert(key.field, measurement::split_for_editing(&shown));
            measurements
                .entry(key.garment)
                .or_default()
                .insert(key.field, Some(RawMeasurement::Text(shown)));
        }

        let completeness = Garment::ALL
            .iter()
            .map(|&garment| (garment, record.measurements.completeness(garment)))
            .collect();

        EditableForm {
            form: CustomerForm {
                name: record.name.clone(),
                phone: record.phone.clone(),
                date: record.date,
                trial_date: record.trial_date,
                delivery_date: record.delivery_date,
                dob: record.dob,
                notes: record.notes.clone(),
                selected_garments: record.selected_garments.clone(),
                measurements,
            },
            editing,
            completeness,
        }
    }
}

#[derive(Clone, Copy)]
enum SaveTarget<'a> {
    Insert { recorded_by: Option<&'a str> },
    Update(Uuid),
}

/// The operations behind every customer screen.
pub struct CustomerService<S> {
    store: S,
}

impl<S: CustomerStore> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn list(&self, mut query: ListQuery) -> Result<CustomerPage, ServiceError> {
        query.page = query.page.max(1);
        query.page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);

        let (customers, count) = self.store.list(&query).await.map_err(failed(Action::Load))?;
        Ok(CustomerPage {
            customers,
            count,
            page: query.page,
            page_size: query.page_size,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<CustomerRecord, ServiceError> {
        self.store
            .get(id)
            .await
            .map_err(failed(Action::Load))?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn create(
        &self,
        form: CustomerForm,
        recorded_by: Option<&str>,
    ) -> Result<CustomerRecord, ServiceError> {
        let customer = form.validate_into()?;
        let record = self
            .save(customer, SaveTarget::Insert { recorded_by })
            .await?;
        info!("Created customer {} ({})", record.id, record.name);
        Ok(record)
    }

    pub async fn update(&self, id: Uuid, form: CustomerForm) -> Result<CustomerRecord, ServiceError> {
        let customer = form.validate_into()?;
        let record = self.save(customer, SaveTarget::Update(id)).await?;
        info!("Updated customer {}", record.id);
        Ok(record)
    }

    /// Resolves the name against same-date records and writes. When the
    /// uniqueness backstop reports a race, resolution runs once more.
    async fn save(
        &self,
        customer: ValidatedCustomer,
        target: SaveTarget<'_>,
    ) -> Result<CustomerRecord, ServiceError> {
        let (action, exclude) = match target {
            SaveTarget::Insert { .. } => (Action::Save, None),
            SaveTarget::Update(id) => (Action::Update, Some(id)),
        };

        let mut retried = false;
        loop {
            let name =
                naming::resolve_unique_name(&self.store, customer.name(), customer.date(), exclude)
                    .await
                    .map_err(failed(action))?;
            if name != customer.name() {
                info!("Renaming {:?} to {:?} on {}", customer.name(), name, customer.date());
            }
            let candidate = customer.clone().with_name(name);

            let written = match target {
                SaveTarget::Insert { recorded_by } => {
                    self.store.insert(&candidate, recorded_by).await.map(Some)
                }
                SaveTarget::Update(id) => self.store.update(id, &candidate).await,
            };

            match written {
                Ok(Some(record)) => return Ok(record),
                Ok(None) => return Err(ServiceError::NotFound),
                Err(StoreError::NameTaken) if !retried => {
                    warn!(
                        "Name {:?} was taken concurrently on {}, resolving again",
                        candidate.name(),
                        candidate.date()
                    );
                    retried = true;
                }
                Err(err) => return Err(failed(action)(err)),
            }
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let removed = self.store.delete(id).await.map_err(failed(Action::Delete))?;
        if !removed {
            return Err(ServiceError::NotFound);
        }
        info!("Deleted customer {}", id);
        Ok(())
    }

    pub async fn toggle_trial(&self, id: Uuid, value: bool) -> Result<(), ServiceError> {
        self.set_flag(id, Milestone::Trial, value, Action::ToggleTrial)
            .await
    }

    pub async fn toggle_delivery(&self, id: Uuid, value: bool) -> Result<(), ServiceError> {
        self.set_flag(id, Milestone::Delivery, value, Action::ToggleDelivery)
            .await
    }

    async fn set_flag(
        &self,
        id: Uuid,
        milestone: Milestone,
        value: bool,
        action: Action,
    ) -> Result<(), ServiceError> {
        let updated = self
            .store
            .set_flag(id, milestone, value)
            .await
            .map_err(failed(action))?;
        if !updated {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    pub async fn edit_form(&self, id: Uuid) -> Result<EditableForm, ServiceError> {
        let record = self.get(id).await?;
        Ok(EditableForm::from_record(&record))
    }

    /// Prefills a new-record form from an existing one. Nothing is stored.
    pub async fn duplicate_template(
        &self,
        id: Uuid,
        today: NaiveDate,
    ) -> Result<EditableForm, ServiceError> {
        let record = self.get(id).await?;
        let mut template = EditableForm::from_record(&record);
        template.form.name = format!("{} (Copy)", record.name);
        template.form.date = today;
        template.form.trial_date = today;
        template.form.delivery_date = today;
        Ok(template)
    }

    pub async fn dashboard_stats(&self, today: NaiveDate) -> Result<DashboardStats, ServiceError> {
        let window = |filter: DateFilter| filter.window(today, None, None);
        let (total, today_count, this_month, this_year) = tokio::try_join!(
            self.store.count(window(DateFilter::All)),
            self.store.count(window(DateFilter::Today)),
            self.store.count(window(DateFilter::Month)),
            self.store.count(window(DateFilter::Year)),
        )
        .map_err(failed(Action::Load))?;

        Ok(DashboardStats {
            total,
            today: today_count,
            this_month,
            this_year,
        })
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<CustomerRecord>, ServiceError> {
        self.store
            .recent(limit.clamp(1, MAX_PAGE_SIZE))
            .await
            .map_err(failed(Action::Load))
    }

    pub async fn due(
        &self,
        milestone: Milestone,
        today: NaiveDate,
        status: StatusFilter,
    ) -> Result<Vec<CustomerRecord>, ServiceError> {
        self.store
            .due_on(milestone, today, status)
            .await
            .map_err(failed(Action::Load))
    }

    /// Today's trials followed by today's deliveries.
    pub async fn inbox(
        &self,
        today: NaiveDate,
        kind: InboxKind,
        status: StatusFilter,
    ) -> Result<Vec<InboxItem>, ServiceError> {
        let (trials, deliveries) = tokio::try_join!(
            self.store.due_on(Milestone::Trial, today, StatusFilter::All),
            self.store.due_on(Milestone::Delivery, today, StatusFilter::All),
        )
        .map_err(failed(Action::Load))?;

        let wanted = |milestone: Milestone| match kind {
            InboxKind::All => true,
            InboxKind::Trial => milestone == Milestone::Trial,
            InboxKind::Delivery => milestone == Milestone::Delivery,
        };

        let items = trials
            .into_iter()
            .map(|customer| (Milestone::Trial, customer))
            .chain(
                deliveries
                    .into_iter()
                    .map(|customer| (Milestone::Delivery, customer)),
            )
            .filter(|(milestone, _)| wanted(*milestone))
            .map(|(milestone, customer)| InboxItem {
                kind: milestone,
                done: customer.milestone_done(milestone),
                customer,
            })
            .filter(|item| status.matches(item.done))
            .collect();
        Ok(items)
    }

    pub async fn statistics(
        &self,
        range: StatisticsRange,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Statistics, ServiceError> {
        let window = range.date_filter().window(today, start, end);
        let dates = self
            .store
            .measurement_dates(window)
            .await
            .map_err(failed(Action::Load))?;

        Ok(Statistics {
            count: dates.len(),
            chart: chart_buckets(range, &dates, today),
        })
    }
}

fn chart_buckets(range: StatisticsRange, dates: &[NaiveDate], today: NaiveDate) -> Vec<ChartBucket> {
    match range {
        StatisticsRange::Day => vec![ChartBucket {
            name: today.format("%b %d").to_string(),
            value: dates.iter().filter(|&&date| date == today).count(),
        }],
        StatisticsRange::Month | StatisticsRange::Custom => {
            let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
            for &date in dates {
                *per_day.entry(date).or_default() += 1;
            }
            per_day
                .into_iter()
                .map(|(date, value)| ChartBucket {
                    name: date.format("%b %d").to_string(),
                    value,
                })
                .collect()
        }
        StatisticsRange::Year => {
            let mut per_month = [0usize; 12];
            for date in dates {
                per_month[date.month0() as usize] += 1;
            }
            MONTHS
                .iter()
                .zip(per_month)
                .map(|(name, value)| ChartBucket {
                    name: name.to_string(),
                    value,
                })
                .collect()
        }
    }
}
