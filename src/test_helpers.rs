use chrono::NaiveDate;

use crate::catalog::{Catalog, VocabularyItem};
use crate::review::{MasteryTier, ReviewState};

pub(crate) fn day(year: i32, month: u32, date: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, date).unwrap()
}

/// Items with ids `1..=n`.
pub(crate) fn sample_catalog(n: u32) -> Catalog {
    (1..=n)
        .map(|id| {
            VocabularyItem::new(id, format!("단어 {id}"), format!("daneo {id}"), format!("word {id}"))
        })
        .collect()
}

pub(crate) fn reviewed_state(interval: u32, last_review: NaiveDate, tier: MasteryTier) -> ReviewState {
    ReviewState {
        interval,
        repetition_count: 3,
        ease_factor: 2.5,
        next_review_date: last_review + chrono::Days::new(interval.into()),
        last_review_date: Some(last_review),
        success_streak: if tier == MasteryTier::Mastered { 3 } else { 0 },
        mastery_tier: tier,
    }
}

pub(crate) fn init_logger() {
    let _ = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}: {}", record.level(), record.target(), message))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply();
}
