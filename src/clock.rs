use chrono::{Local, NaiveDate};

/// Source of the current calendar day. All due-date comparisons happen at
/// day granularity.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// The host's local calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to a given day, advanced manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    day: NaiveDate,
}

impl FixedClock {
    pub fn new(day: NaiveDate) -> Self {
        Self { day }
    }

    pub fn set(&mut self, day: NaiveDate) {
        self.day = day;
    }

    pub fn advance_days(&mut self, days: u32) {
        self.day = self
            .day
            .checked_add_days(chrono::Days::new(days.into()))
            .unwrap_or(NaiveDate::MAX);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.day
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
