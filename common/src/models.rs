use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ValidationFailure, impl_str_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Garment {
    Shirt,
    Pant,
    Coat,
    Kurta,
    Pyjama,
    #[serde(rename = "Modi Jacket")]
    ModiJacket,
    Safari,
    Jodhpuri,
}

impl_str_enum!(
    Garment,
    Shirt => "Shirt",
    Pant => "Pant",
    Coat => "Coat",
    Kurta => "Kurta",
    Pyjama => "Pyjama",
    ModiJacket => "Modi Jacket",
    Safari => "Safari",
    Jodhpuri => "Jodhpuri",
);

const UPPER_BODY: &[MeasurementField] = &[
    MeasurementField::Length,
    MeasurementField::Shoulder,
    MeasurementField::Astin,
    MeasurementField::Cuff,
    MeasurementField::Chest,
    MeasurementField::Waist,
    MeasurementField::Seat,
    MeasurementField::Collar,
];

const LOWER_BODY: &[MeasurementField] = &[
    MeasurementField::Length,
    MeasurementField::Knee,
    MeasurementField::Fork,
    MeasurementField::Waist,
    MeasurementField::Hip,
    MeasurementField::Thigh,
    MeasurementField::Bottom,
];

impl Garment {
    /// Storage column prefix, e.g. `modi` in `modi_chest`.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            Garment::Shirt => "shirt",
            Garment::Pant => "pant",
            Garment::Coat => "coat",
            Garment::Kurta => "kurta",
            Garment::Pyjama => "pyjama",
            Garment::ModiJacket => "modi",
            Garment::Safari => "safari",
            Garment::Jodhpuri => "jodhpuri",
        }
    }

    /// Fields measured for this garment, in display order.
    pub fn fields(&self) -> &'static [MeasurementField] {
        match self {
            Garment::Pant | Garment::Pyjama => LOWER_BODY,
            _ => UPPER_BODY,
        }
    }

    pub fn has_field(&self, field: MeasurementField) -> bool {
        self.fields().contains(&field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementField {
    Length,
    Shoulder,
    Astin,
    Cuff,
    Chest,
    Waist,
    Seat,
    Collar,
    Knee,
    Fork,
    Hip,
    Thigh,
    Bottom,
}

impl_str_enum!(
    MeasurementField,
    Length => "length",
    Shoulder => "shoulder",
    Astin => "astin",
    Cuff => "cuff",
    Chest => "chest",
    Waist => "waist",
    Seat => "seat",
    Collar => "collar",
    Knee => "knee",
    Fork => "fork",
    Hip => "hip",
    Thigh => "thigh",
    Bottom => "bottom",
);

impl MeasurementField {
    pub fn label(&self) -> &'static str {
        match self {
            MeasurementField::Length => "Length",
            MeasurementField::Shoulder => "Shoulder",
            MeasurementField::Astin => "Astin",
            MeasurementField::Cuff => "Cuff",
            MeasurementField::Chest => "Chest",
            MeasurementField::Waist => "Waist",
            MeasurementField::Seat => "Seat",
            MeasurementField::Collar => "Collar",
            MeasurementField::Knee => "Knee",
            MeasurementField::Fork => "Fork",
            MeasurementField::Hip => "Hip",
            MeasurementField::Thigh => "Thigh",
            MeasurementField::Bottom => "Bottom",
        }
    }
}

/// One (garment, field) cell of the measurement sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeasurementKey {
    pub garment: Garment,
    pub field: MeasurementField,
}

impl MeasurementKey {
    /// Every valid key, garment by garment.
    pub fn all() -> impl Iterator<Item = MeasurementKey> {
        Garment::ALL.iter().flat_map(|&garment| {
            garment
                .fields()
                .iter()
                .map(move |&field| MeasurementKey { garment, field })
        })
    }

    pub fn column(&self) -> String {
        format!("{}_{}", self.garment.column_prefix(), self.field.as_str())
    }
}

/// Measurement values keyed by garment then field. Only fields that belong
/// to their garment can be stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Garment, BTreeMap<MeasurementField, f64>>")]
pub struct Measurements(BTreeMap<Garment, BTreeMap<MeasurementField, f64>>);

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        garment: Garment,
        field: MeasurementField,
        value: f64,
    ) -> Result<(), ValidationFailure> {
        if !garment.has_field(field) {
            return Err(ValidationFailure::new(
                format!("{}_{}", garment.column_prefix(), field.as_str()),
                format!("{} has no {} measurement", garment, field.as_str()),
            ));
        }
        self.0.entry(garment).or_default().insert(field, value);
        Ok(())
    }

    pub fn get(&self, garment: Garment, field: MeasurementField) -> Option<f64> {
        self.0.get(&garment).and_then(|fields| fields.get(&field)).copied()
    }

    pub fn get_key(&self, key: MeasurementKey) -> Option<f64> {
        self.get(key.garment, key.field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeasurementKey, f64)> + '_ {
        self.0.iter().flat_map(|(&garment, fields)| {
            fields
                .iter()
                .map(move |(&field, &value)| (MeasurementKey { garment, field }, value))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|fields| fields.is_empty())
    }

    pub fn completeness(&self, garment: Garment) -> Completeness {
        let filled = garment
            .fields()
            .iter()
            .filter(|&&field| self.get(garment, field).is_some())
            .count();
        Completeness {
            filled,
            total: garment.fields().len(),
        }
    }
}

impl TryFrom<BTreeMap<Garment, BTreeMap<MeasurementField, f64>>> for Measurements {
    type Error = ValidationFailure;

    fn try_from(raw: BTreeMap<Garment, BTreeMap<MeasurementField, f64>>) -> Result<Self, Self::Error> {
        let mut measurements = Measurements::new();
        for (garment, fields) in raw {
            for (field, value) in fields {
                measurements.insert(garment, field, value)?;
            }
        }
        Ok(measurements)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub filled: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    /// Measurement date.
    pub date: NaiveDate,
    pub trial_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub dob: Option<NaiveDate>,
    pub notes: Option<String>,
    pub selected_garments: Vec<Garment>,
    pub measurements: Measurements,
    pub is_trialed: Option<bool>,
    pub is_delivered: Option<bool>,
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerRecord {
    pub fn milestone_done(&self, milestone: Milestone) -> bool {
        match milestone {
            Milestone::Trial => self.is_trialed.unwrap_or(false),
            Milestone::Delivery => self.is_delivered.unwrap_or(false),
        }
    }

    pub fn milestone_date(&self, milestone: Milestone) -> NaiveDate {
        match milestone {
            Milestone::Trial => self.trial_date,
            Milestone::Delivery => self.delivery_date,
        }
    }
}

/// The two checkpoints after measurement, each with its own date and flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Milestone {
    Trial,
    Delivery,
}

impl_str_enum!(Milestone, Trial => "trial", Delivery => "delivery");

impl Milestone {
    pub fn date_column(&self) -> &'static str {
        match self {
            Milestone::Trial => "trial_date",
            Milestone::Delivery => "delivery_date",
        }
    }

    pub fn flag_column(&self) -> &'static str {
        match self {
            Milestone::Trial => "is_trialed",
            Milestone::Delivery => "is_delivered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Month,
    Year,
    Custom,
}

impl_str_enum!(
    DateFilter,
    All => "all",
    Today => "today" | "day",
    Month => "month",
    Year => "year",
    Custom => "custom",
);

/// Inclusive bounds on the measurement date; `None` leaves a side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

impl DateFilter {
    /// Resolves the filter against `today`. A custom range needs both ends,
    /// otherwise it matches everything.
    pub fn window(
        &self,
        today: NaiveDate,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> DateWindow {
        match self {
            DateFilter::All => DateWindow::default(),
            DateFilter::Today => DateWindow {
                from: Some(today),
                to: Some(today),
            },
            DateFilter::Month => DateWindow {
                from: today.with_day(1),
                to: None,
            },
            DateFilter::Year => DateWindow {
                from: NaiveDate::from_ymd_opt(today.year(), 1, 1),
                to: None,
            },
            DateFilter::Custom => match (start, end) {
                (Some(from), Some(to)) => DateWindow {
                    from: Some(from),
                    to: Some(to),
                },
                _ => DateWindow::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl_str_enum!(SortOrder, Asc => "asc", Desc => "desc");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Done,
    Pending,
}

impl_str_enum!(
    StatusFilter,
    All => "all",
    Done => "done" | "delivered" | "trialed",
    Pending => "pending" | "not_delivered" | "not_trialed",
);

impl StatusFilter {
    pub fn matches(&self, done: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Done => done,
            StatusFilter::Pending => !done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboxKind {
    #[default]
    All,
    Trial,
    Delivery,
}

impl_str_enum!(InboxKind, All => "all", Trial => "trial", Delivery => "delivery");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatisticsRange {
    Day,
    #[default]
    Month,
    Year,
    Custom,
}

impl_str_enum!(
    StatisticsRange,
    Day => "day" | "today",
    Month => "month",
    Year => "year",
    Custom => "custom",
);

impl StatisticsRange {
    pub fn date_filter(&self) -> DateFilter {
        match self {
            StatisticsRange::Day => DateFilter::Today,
            StatisticsRange::Month => DateFilter::Month,
            StatisticsRange::Year => DateFilter::Year,
            StatisticsRange::Custom => DateFilter::Custom,
        }
    }
}

/// Inputs of the customer list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub phone: String,
    pub sort: SortOrder,
    pub page: u32,
    pub page_size: u32,
    pub window: DateWindow,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            phone: String::new(),
            sort: SortOrder::Desc,
            page: 1,
            page_size: 10,
            window: DateWindow::default(),
        }
    }
}

impl ListQuery {
    /// Rows skipped before this page. Widened so any `page` is representable.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerPage {
    pub customers: Vec<CustomerRecord>,
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: i64,
    pub today: i64,
    pub this_month: i64,
    pub this_year: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxItem {
    #[serde(rename = "type")]
    pub kind: Milestone,
    pub done: bool,
    #[serde(flatten)]
    pub customer: CustomerRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartBucket {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub chart: Vec<ChartBucket>,
}
