use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use strum::{Display, EnumIter, EnumString};

use crate::catalog::ItemId;
use crate::error::{Result, UnknownRatingSnafu};
use crate::store::{KeyValueStore, load_json, save_json};

/// The learner's answer for one card.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Easy,
    Medium,
    Hard,
}

impl Rating {
    /// Strict parse: anything but easy/medium/hard is an error.
    pub fn parse(label: &str) -> Result<Self> {
        label
            .trim()
            .parse()
            .ok()
            .context(UnknownRatingSnafu { value: label })
    }

    /// Permissive parse kept for stored and UI labels: everything that is not
    /// easy or hard counts as medium.
    pub fn from_label(label: &str) -> Self {
        match Self::parse(label) {
            Ok(rating) => rating,
            Err(_) => {
                debug!("treating unknown rating `{label}` as medium");
                Rating::Medium
            }
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MasteryTier {
    #[default]
    New,
    Normal,
    Struggling,
    Mastered,
}

/// Scheduling state of one item, created on its first rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReviewState {
    /// Days between the last review and the next one, at least 1.
    pub interval: u32,
    #[serde(alias = "repetitions")]
    pub repetition_count: u32,
    pub ease_factor: f64,
    #[serde(alias = "nextReview")]
    pub next_review_date: NaiveDate,
    #[serde(alias = "lastReview")]
    pub last_review_date: Option<NaiveDate>,
    #[serde(alias = "streak")]
    pub success_streak: u32,
    #[serde(alias = "priority")]
    pub mastery_tier: MasteryTier,
}

impl ReviewState {
    pub fn new(initial_ease: f64, today: NaiveDate) -> Self {
        Self {
            interval: 1,
            repetition_count: 0,
            ease_factor: initial_ease,
            next_review_date: today,
            last_review_date: None,
            success_streak: 0,
            mastery_tier: MasteryTier::New,
        }
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review_date <= today
    }

    /// Whole days until the item is due; zero or negative once it is.
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.next_review_date - today).num_days()
    }

    /// Clamps values that break the interval/ease invariants, returning
    /// whether anything changed.
    pub(crate) fn repair(&mut self, ease_floor: f64) -> bool {
        let mut repaired = false;
        if self.interval == 0 {
            self.interval = 1;
            repaired = true;
        }
        if !self.ease_factor.is_finite() || self.ease_factor < ease_floor {
            self.ease_factor = ease_floor;
            repaired = true;
        }
        repaired
    }
}

/// All review states keyed by item id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewTable {
    states: BTreeMap<ItemId, ReviewState>,
}

impl ReviewTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the table from `key`. A value that is not a JSON object is
    /// discarded whole; individual malformed records are dropped, which makes
    /// those items new again.
    pub(crate) fn load(store: &impl KeyValueStore, key: &str, ease_floor: f64) -> Self {
        let Some(raw) = load_json::<BTreeMap<String, serde_json::Value>>(store, key) else {
            return Self::default();
        };
        let mut states = BTreeMap::new();
        for (id, value) in raw {
            let Ok(id) = id.parse::<ItemId>() else {
                warn!("dropping review state with non-numeric id `{id}`");
                continue;
            };
            match serde_json::from_value::<ReviewState>(value) {
                Ok(mut state) => {
                    if state.repair(ease_floor) {
                        warn!("repaired out-of-range review state for item {id}");
                    }
                    states.insert(id, state);
                }
                Err(err) => warn!("dropping malformed review state for item {id}: {err}"),
            }
        }
        Self { states }
    }

    pub(crate) fn save(&self, store: &mut impl KeyValueStore, key: &str) -> bool {
        save_json(store, key, self)
    }

    pub fn get(&self, id: ItemId) -> Option<&ReviewState> {
        self.states.get(&id)
    }

    pub(crate) fn insert(&mut self, id: ItemId, state: ReviewState) {
        self.states.insert(id, state);
    }

    pub(crate) fn get_or_insert(&mut self, id: ItemId, seed: ReviewState) -> &mut ReviewState {
        self.states.entry(id).or_insert(seed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &ReviewState)> {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut ReviewState> {
        self.states.values_mut()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
