use chrono::{Days, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ItemId};
use crate::error::{InvalidConfigSnafu, Result};
use crate::review::{MasteryTier, Rating, ReviewState, ReviewTable};
use crate::store::{KeyValueStore, StorageKeys};

pub const DEFAULT_INITIAL_EASE: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Population-wide interval correction run after every rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdaptiveConfig {
    pub enabled: bool,
    /// How many of the most recently reviewed states are inspected.
    pub window: usize,
    /// Below this many reviewed states in the window the pass is skipped.
    pub min_sample: usize,
    pub shrink_above: u32,
    pub shrink_factor: f64,
    pub grow_below: u32,
    pub grow_factor: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 20,
            min_sample: 5,
            shrink_above: 7,
            shrink_factor: 0.9,
            grow_below: 30,
            grow_factor: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub initial_ease: f64,
    pub ease_floor: f64,
    pub easy_ease_delta: f64,
    pub medium_ease_delta: f64,
    pub hard_ease_delta: f64,
    pub easy_multiplier: f64,
    pub hard_multiplier: f64,
    /// Fixed intervals for "medium", indexed by the number of reviews the item
    /// had before the current one.
    pub graduation_steps: Vec<u32>,
    /// "medium" uses `graduation_steps` while the repetition count, including
    /// the current review, is at most this.
    pub graduation_reviews: u32,
    pub mastery_streak: u32,
    pub struggling_after: u32,
    pub adaptive: AdaptiveConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease: DEFAULT_INITIAL_EASE,
            ease_floor: MIN_EASE_FACTOR,
            easy_ease_delta: -0.2,
            medium_ease_delta: 0.0,
            hard_ease_delta: 0.2,
            easy_multiplier: 2.5,
            hard_multiplier: 0.5,
            graduation_steps: vec![1, 6, 10],
            graduation_reviews: 2,
            mastery_streak: 3,
            struggling_after: 3,
            adaptive: AdaptiveConfig::default(),
        }
    }
}

pub(crate) fn ensure(condition: bool, reason: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        InvalidConfigSnafu { reason }.fail()
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure(positive(self.ease_floor), "ease floor must be positive")?;
        ensure(
            self.initial_ease.is_finite() && self.initial_ease >= self.ease_floor,
            "initial ease must not be below the ease floor",
        )?;
        ensure(
            [
                self.easy_ease_delta,
                self.medium_ease_delta,
                self.hard_ease_delta,
            ]
            .iter()
            .all(|delta| delta.is_finite()),
            "ease deltas must be finite",
        )?;
        ensure(
            positive(self.easy_multiplier) && positive(self.hard_multiplier),
            "interval multipliers must be positive",
        )?;
        ensure(
            !self.graduation_steps.is_empty() && self.graduation_steps.iter().all(|s| *s > 0),
            "graduation steps must be non-empty and at least one day each",
        )?;
        ensure(
            self.graduation_reviews as usize <= self.graduation_steps.len(),
            "graduation reviews exceed the number of graduation steps",
        )?;
        ensure(self.mastery_streak > 0, "mastery streak must be at least 1")?;
        self.adaptive.validate()
    }

    fn ease_delta(&self, rating: Rating) -> f64 {
        match rating {
            Rating::Easy => self.easy_ease_delta,
            Rating::Medium => self.medium_ease_delta,
            Rating::Hard => self.hard_ease_delta,
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self) -> Result<()> {
        ensure(self.window > 0, "adaptive window must not be empty")?;
        ensure(
            positive(self.shrink_factor) && positive(self.grow_factor),
            "adaptive factors must be positive",
        )
    }
}

/// What the adaptive pass did to the review table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Not enough recently reviewed items, or the pass is disabled.
    Skipped,
    Unchanged,
    /// Long intervals were shortened for more practice.
    Shrunk { items: usize },
    /// Short intervals were lengthened for faster progression.
    Grown { items: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingOutcome {
    pub state: ReviewState,
    pub adjustment: Adjustment,
    /// Whether the review table reached the store. On `false` the in-memory
    /// state is still updated and the caller may retry with
    /// [`Scheduler::persist`].
    pub persisted: bool,
}

/// Multiplies an interval and rounds half away from zero, never below one day.
fn scale(interval: u32, factor: f64) -> u32 {
    (f64::from(interval) * factor)
        .round()
        .clamp(1.0, f64::from(u32::MAX)) as u32
}

fn add_days(day: NaiveDate, days: u32) -> NaiveDate {
    day.checked_add_days(Days::new(days.into()))
        .unwrap_or(NaiveDate::MAX)
}

/// Owns the review table and advances items on each rating, writing the
/// whole table through to the store afterwards.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    table: ReviewTable,
    key: String,
}

impl Scheduler {
    /// A scheduler with an empty review table.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            table: ReviewTable::new(),
            key: StorageKeys::default().review_states,
        })
    }

    /// Restores the review table from `store`. Corrupt data is recovered as
    /// an empty (or partially empty) table, never reported as an error.
    pub fn load(
        config: SchedulerConfig,
        keys: &StorageKeys,
        store: &impl KeyValueStore,
    ) -> Result<Self> {
        config.validate()?;
        let table = ReviewTable::load(store, &keys.review_states, config.ease_floor);
        debug!("loaded {} review states", table.len());
        Ok(Self {
            config,
            table,
            key: keys.review_states.clone(),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn table(&self) -> &ReviewTable {
        &self.table
    }

    pub fn review_state(&self, id: ItemId) -> Option<&ReviewState> {
        self.table.get(id)
    }

    /// Never-reviewed items are always due.
    pub fn is_due(&self, id: ItemId, today: NaiveDate) -> bool {
        self.table
            .get(id)
            .is_none_or(|state| state.is_due(today))
    }

    /// Due ids in catalog order.
    pub fn due_items(&self, catalog: &Catalog, today: NaiveDate) -> Vec<ItemId> {
        catalog.ids().filter(|id| self.is_due(*id, today)).collect()
    }

    /// `None` for items that were never reviewed.
    pub fn days_until_due(&self, id: ItemId, today: NaiveDate) -> Option<i64> {
        self.table.get(id).map(|state| state.days_until_due(today))
    }

    pub fn rate(
        &mut self,
        store: &mut impl KeyValueStore,
        id: ItemId,
        rating: Rating,
        today: NaiveDate,
    ) -> RatingOutcome {
        let config = &self.config;
        let state = self
            .table
            .get_or_insert(id, ReviewState::new(config.initial_ease, today));

        let previous_reviews = state.repetition_count;
        state.repetition_count = state.repetition_count.saturating_add(1);
        state.last_review_date = Some(today);
        state.ease_factor = (state.ease_factor + config.ease_delta(rating)).max(config.ease_floor);

        match rating {
            Rating::Easy => {
                state.interval = scale(state.interval, config.easy_multiplier);
                state.success_streak = state.success_streak.saturating_add(1);
                state.mastery_tier = if state.success_streak >= config.mastery_streak {
                    MasteryTier::Mastered
                } else {
                    MasteryTier::Normal
                };
            }
            Rating::Hard => {
                state.interval = scale(state.interval, config.hard_multiplier);
                state.success_streak = 0;
                state.mastery_tier = if state.repetition_count >= config.struggling_after {
                    MasteryTier::Struggling
                } else {
                    MasteryTier::Normal
                };
            }
            Rating::Medium => {
                let step = config.graduation_steps.get(previous_reviews as usize);
                state.interval = match step {
                    Some(days) if state.repetition_count <= config.graduation_reviews => *days,
                    _ => scale(state.interval, state.ease_factor),
                };
                state.success_streak = state.success_streak.saturating_add(1);
                if state.mastery_tier != MasteryTier::Mastered {
                    state.mastery_tier = MasteryTier::Normal;
                }
            }
        }

        state.next_review_date = add_days(today, state.interval);
        debug!(
            "item {id} rated {rating}: interval {} days, ease {:.2}, tier {}",
            state.interval, state.ease_factor, state.mastery_tier
        );

        let adjustment = self.adjust_difficulty();
        let persisted = self.persist(store);
        let state = self
            .table
            .get(id)
            .cloned()
            .unwrap_or_else(|| ReviewState::new(self.config.initial_ease, today));
        RatingOutcome {
            state,
            adjustment,
            persisted,
        }
    }

    /// Nudges every interval based on how the most recently reviewed items
    /// are doing. Reads current state only, so back-to-back calls compound.
    pub fn adjust_difficulty(&mut self) -> Adjustment {
        let adaptive = &self.config.adaptive;
        if !adaptive.enabled {
            return Adjustment::Skipped;
        }

        let mut reviewed: Vec<(NaiveDate, ItemId, MasteryTier)> = self
            .table
            .iter()
            .filter_map(|(id, state)| {
                state
                    .last_review_date
                    .map(|day| (day, id, state.mastery_tier))
            })
            .collect();
        reviewed.sort_unstable_by_key(|(day, id, _)| (*day, *id));
        let recent = &reviewed[reviewed.len().saturating_sub(adaptive.window)..];
        if recent.len() < adaptive.min_sample {
            return Adjustment::Skipped;
        }

        let mastered = recent
            .iter()
            .filter(|(_, _, tier)| *tier == MasteryTier::Mastered)
            .count();
        let struggling = recent
            .iter()
            .filter(|(_, _, tier)| *tier == MasteryTier::Struggling)
            .count();

        let (shrink_above, shrink_factor) = (adaptive.shrink_above, adaptive.shrink_factor);
        let (grow_below, grow_factor) = (adaptive.grow_below, adaptive.grow_factor);
        let adjustment = if struggling > mastered {
            let mut items = 0;
            for state in self.table.values_mut() {
                if state.interval > shrink_above {
                    state.interval = scale(state.interval, shrink_factor);
                    items += 1;
                }
            }
            Adjustment::Shrunk { items }
        } else if mastered > 2 * struggling {
            let mut items = 0;
            for state in self.table.values_mut() {
                if state.interval < grow_below {
                    state.interval = scale(state.interval, grow_factor);
                    items += 1;
                }
            }
            Adjustment::Grown { items }
        } else {
            Adjustment::Unchanged
        };

        if matches!(
            adjustment,
            Adjustment::Shrunk { .. } | Adjustment::Grown { .. }
        ) {
            info!(
                "adaptive pass ({mastered} mastered, {struggling} struggling of {}): {adjustment:?}",
                recent.len()
            );
        }
        adjustment
    }

    /// Writes the whole review table to the store.
    pub fn persist(&self, store: &mut impl KeyValueStore) -> bool {
        self.table.save(store, &self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    use crate::store::MemoryStore;
    use crate::test_helpers::{day, init_logger, reviewed_state, sample_catalog};

    fn scheduler() -> Scheduler {
        Scheduler::new(SchedulerConfig::default()).unwrap()
    }

    #[test]
    fn unreviewed_items_are_always_due() {
        let scheduler = scheduler();
        for today in [NaiveDate::MIN, day(2024, 3, 1), NaiveDate::MAX] {
            assert!(scheduler.is_due(42, today));
        }
        assert_eq!(scheduler.days_until_due(42, day(2024, 3, 1)), None);
    }

    #[test]
    fn first_medium_rating_uses_first_step() {
        init_logger();
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        let today = day(2024, 3, 1);

        let outcome = scheduler.rate(&mut store, 1, Rating::Medium, today);

        let state = outcome.state;
        assert_eq!(state.repetition_count, 1);
        assert_eq!(state.interval, 1);
        assert_eq!(state.next_review_date, day(2024, 3, 2));
        assert_eq!(state.last_review_date, Some(today));
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.success_streak, 1);
        assert_eq!(state.mastery_tier, MasteryTier::Normal);
        assert!(outcome.persisted);
        assert!(!scheduler.is_due(1, today));
        assert!(scheduler.is_due(1, day(2024, 3, 2)));
        assert_eq!(scheduler.days_until_due(1, today), Some(1));
    }

    #[test]
    fn second_medium_rating_uses_second_step() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        scheduler.rate(&mut store, 1, Rating::Medium, day(2024, 3, 1));
        let state = scheduler
            .rate(&mut store, 1, Rating::Medium, day(2024, 3, 2))
            .state;
        assert_eq!(state.repetition_count, 2);
        assert_eq!(state.interval, 6);
        assert_eq!(state.next_review_date, day(2024, 3, 8));
    }

    #[test]
    fn medium_after_graduation_multiplies_by_ease() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        let mut state = reviewed_state(10, day(2024, 2, 20), MasteryTier::Normal);
        state.repetition_count = 2;
        state.ease_factor = 2.0;
        scheduler.table.insert(7, state);

        let state = scheduler
            .rate(&mut store, 7, Rating::Medium, day(2024, 3, 1))
            .state;
        assert_eq!(state.repetition_count, 3);
        assert_eq!(state.interval, 20);
        assert_eq!(state.next_review_date, day(2024, 3, 21));
    }

    #[test]
    fn easy_grows_interval_and_lowers_ease() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        for (interval, expected) in [(1, 3), (4, 10), (7, 18), (10, 25)] {
            let mut state = reviewed_state(interval, day(2024, 2, 1), MasteryTier::Normal);
            state.repetition_count = 1;
            scheduler.table.insert(interval, state);
            let state = scheduler
                .rate(&mut store, interval, Rating::Easy, day(2024, 3, 1))
                .state;
            assert_eq!(state.interval, expected, "easy from {interval}");
            assert!((state.ease_factor - 2.3).abs() < 1e-9);
        }
    }

    #[test]
    fn hard_halves_interval_but_never_below_one_day() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        let today = day(2024, 3, 1);
        for _ in 0..6 {
            let state = scheduler.rate(&mut store, 3, Rating::Hard, today).state;
            assert!(state.interval >= 1);
            assert_eq!(state.success_streak, 0);
        }

        let mut state = reviewed_state(9, day(2024, 2, 1), MasteryTier::Normal);
        state.repetition_count = 1;
        scheduler.table.insert(4, state);
        let state = scheduler.rate(&mut store, 4, Rating::Hard, today).state;
        assert_eq!(state.interval, 5);
        assert!((state.ease_factor - 2.7).abs() < 1e-9);
    }

    #[test]
    fn ease_factor_never_drops_below_floor() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        let ratings = [Rating::Easy, Rating::Easy, Rating::Medium, Rating::Hard];
        let mut today = day(2024, 1, 1);
        for rating in ratings.iter().cycle().take(60) {
            let state = scheduler.rate(&mut store, 1, *rating, today).state;
            assert!(state.ease_factor >= MIN_EASE_FACTOR);
            assert!(state.interval >= 1);
            today = state.next_review_date;
        }

        for _ in 0..20 {
            scheduler.rate(&mut store, 2, Rating::Easy, day(2024, 1, 1));
        }
        assert_eq!(scheduler.review_state(2).unwrap().ease_factor, MIN_EASE_FACTOR);

        for (id, rating) in (10..).zip(Rating::iter()) {
            for _ in 0..20 {
                let state = scheduler.rate(&mut store, id, rating, day(2024, 1, 1)).state;
                assert!(state.ease_factor >= MIN_EASE_FACTOR, "{rating}");
            }
        }
    }

    #[test]
    fn three_easy_ratings_master_an_item_and_hard_breaks_it() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        let today = day(2024, 3, 1);
        let tiers: Vec<_> = (0..3)
            .map(|_| scheduler.rate(&mut store, 1, Rating::Easy, today).state.mastery_tier)
            .collect();
        assert_eq!(
            tiers,
            [MasteryTier::Normal, MasteryTier::Normal, MasteryTier::Mastered]
        );

        let state = scheduler.rate(&mut store, 1, Rating::Medium, today).state;
        assert_eq!(state.mastery_tier, MasteryTier::Mastered);
        assert_eq!(state.success_streak, 4);

        let state = scheduler.rate(&mut store, 1, Rating::Hard, today).state;
        assert_eq!(state.mastery_tier, MasteryTier::Struggling);
        assert_eq!(state.success_streak, 0);

        let state = scheduler.rate(&mut store, 1, Rating::Medium, today).state;
        assert_eq!(state.mastery_tier, MasteryTier::Normal);
    }

    #[test]
    fn early_hard_ratings_do_not_mark_struggling() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        let today = day(2024, 3, 1);
        let first = scheduler.rate(&mut store, 1, Rating::Hard, today).state;
        let second = scheduler.rate(&mut store, 1, Rating::Hard, today).state;
        let third = scheduler.rate(&mut store, 1, Rating::Hard, today).state;
        assert_eq!(first.mastery_tier, MasteryTier::Normal);
        assert_eq!(second.mastery_tier, MasteryTier::Normal);
        assert_eq!(third.mastery_tier, MasteryTier::Struggling);
    }

    fn seeded(entries: &[(u32, MasteryTier)]) -> Scheduler {
        let mut scheduler = scheduler();
        for (id, (interval, tier)) in entries.iter().enumerate() {
            scheduler
                .table
                .insert(id as ItemId, reviewed_state(*interval, day(2024, 3, 1), *tier));
        }
        scheduler
    }

    fn intervals(scheduler: &Scheduler) -> Vec<u32> {
        scheduler.table.iter().map(|(_, s)| s.interval).collect()
    }

    #[test]
    fn struggling_majority_shrinks_long_intervals() {
        let mut scheduler = seeded(&[
            (20, MasteryTier::Struggling),
            (8, MasteryTier::Struggling),
            (5, MasteryTier::Struggling),
            (40, MasteryTier::Mastered),
            (40, MasteryTier::Mastered),
        ]);
        assert_eq!(
            scheduler.adjust_difficulty(),
            Adjustment::Shrunk { items: 4 }
        );
        assert_eq!(intervals(&scheduler), [18, 7, 5, 36, 36]);

        // no delta tracking: a second pass compounds
        scheduler.adjust_difficulty();
        assert_eq!(intervals(&scheduler), [16, 7, 5, 32, 32]);
    }

    #[test]
    fn mastered_majority_grows_short_intervals() {
        let mut scheduler = seeded(&[
            (10, MasteryTier::Mastered),
            (29, MasteryTier::Mastered),
            (30, MasteryTier::Mastered),
            (5, MasteryTier::Mastered),
            (1, MasteryTier::Normal),
        ]);
        assert_eq!(scheduler.adjust_difficulty(), Adjustment::Grown { items: 4 });
        assert_eq!(intervals(&scheduler), [11, 32, 30, 6, 1]);
    }

    #[test]
    fn balanced_population_is_left_alone() {
        let mut scheduler = seeded(&[
            (20, MasteryTier::Mastered),
            (20, MasteryTier::Mastered),
            (20, MasteryTier::Struggling),
            (20, MasteryTier::Normal),
            (20, MasteryTier::New),
        ]);
        assert_eq!(scheduler.adjust_difficulty(), Adjustment::Unchanged);
        assert_eq!(intervals(&scheduler), [20; 5]);
    }

    #[test]
    fn small_samples_skip_the_pass() {
        let mut scheduler = seeded(&[
            (20, MasteryTier::Struggling),
            (20, MasteryTier::Struggling),
            (20, MasteryTier::Struggling),
            (20, MasteryTier::Struggling),
        ]);
        let mut never_reviewed = ReviewState::new(2.5, day(2024, 3, 1));
        never_reviewed.interval = 20;
        scheduler.table.insert(99, never_reviewed);

        assert_eq!(scheduler.adjust_difficulty(), Adjustment::Skipped);
        assert_eq!(intervals(&scheduler), [20; 5]);
    }

    #[test]
    fn only_the_most_recent_window_counts() {
        let mut scheduler = scheduler();
        // ten old struggling items, then four struggling and sixteen mastered
        for id in 0..10 {
            scheduler.table.insert(
                id,
                reviewed_state(10, day(2024, 1, 1), MasteryTier::Struggling),
            );
        }
        for id in 10..30 {
            let tier = if id < 14 {
                MasteryTier::Struggling
            } else {
                MasteryTier::Mastered
            };
            scheduler
                .table
                .insert(id, reviewed_state(10, day(2024, 2, 1), tier));
        }
        assert_eq!(
            scheduler.adjust_difficulty(),
            Adjustment::Grown { items: 30 }
        );
        assert!(intervals(&scheduler).iter().all(|i| *i == 11));
    }

    #[test]
    fn rating_runs_the_shrinking_pass() {
        let mut store = MemoryStore::new();
        let mut scheduler = seeded(&[
            (20, MasteryTier::Struggling),
            (8, MasteryTier::Struggling),
            (5, MasteryTier::Struggling),
            (20, MasteryTier::Struggling),
            (20, MasteryTier::Struggling),
        ]);
        let outcome = scheduler.rate(&mut store, 10, Rating::Hard, day(2024, 3, 2));
        assert_eq!(outcome.adjustment, Adjustment::Shrunk { items: 4 });
        assert_eq!(intervals(&scheduler), [18, 7, 5, 18, 18, 1]);
        assert!(outcome.persisted);
    }

    #[test]
    fn rating_runs_the_growing_pass() {
        let mut store = MemoryStore::new();
        let mut scheduler = seeded(&[
            (10, MasteryTier::Mastered),
            (29, MasteryTier::Mastered),
            (30, MasteryTier::Mastered),
            (5, MasteryTier::Mastered),
            (40, MasteryTier::Mastered),
        ]);
        let outcome = scheduler.rate(&mut store, 10, Rating::Easy, day(2024, 3, 2));
        assert_eq!(outcome.adjustment, Adjustment::Grown { items: 4 });
        assert_eq!(intervals(&scheduler), [11, 32, 30, 6, 40, 3]);
        // the returned state already reflects the pass
        assert_eq!(outcome.state.interval, 3);
    }

    #[test]
    fn disabled_adaptive_pass_does_nothing() {
        let config = SchedulerConfig {
            adaptive: AdaptiveConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut scheduler = Scheduler::new(config).unwrap();
        for id in 0..5 {
            scheduler
                .table
                .insert(id, reviewed_state(20, day(2024, 3, 1), MasteryTier::Struggling));
        }
        assert_eq!(scheduler.adjust_difficulty(), Adjustment::Skipped);
    }

    #[test]
    fn rating_persists_and_reloads() {
        let mut store = MemoryStore::new();
        let keys = StorageKeys::default();
        let mut scheduler = Scheduler::load(SchedulerConfig::default(), &keys, &store).unwrap();
        scheduler.rate(&mut store, 1, Rating::Easy, day(2024, 3, 1));
        scheduler.rate(&mut store, 2, Rating::Hard, day(2024, 3, 1));

        let reloaded = Scheduler::load(SchedulerConfig::default(), &keys, &store).unwrap();
        assert_eq!(reloaded.table(), scheduler.table());
        assert!(store.contains(&keys.review_states));
    }

    #[test]
    fn failed_save_keeps_in_memory_state() {
        let mut store = MemoryStore::with_quota(0);
        let mut scheduler = scheduler();
        let outcome = scheduler.rate(&mut store, 1, Rating::Medium, day(2024, 3, 1));
        assert!(!outcome.persisted);
        assert_eq!(scheduler.review_state(1), Some(&outcome.state));

        let mut roomy = MemoryStore::new();
        assert!(scheduler.persist(&mut roomy));
    }

    #[test]
    fn corrupt_store_loads_as_all_new() {
        let mut store = MemoryStore::new();
        let keys = StorageKeys::default();
        store.insert_raw(&keys.review_states, "{\"1\": tru");
        let scheduler = Scheduler::load(SchedulerConfig::default(), &keys, &store).unwrap();
        assert!(scheduler.table().is_empty());
        let catalog = sample_catalog(3);
        assert_eq!(scheduler.due_items(&catalog, day(2024, 3, 1)), [1, 2, 3]);
    }

    #[test]
    fn due_items_follow_catalog_order() {
        let mut store = MemoryStore::new();
        let mut scheduler = scheduler();
        let today = day(2024, 3, 1);
        scheduler.rate(&mut store, 2, Rating::Easy, today);
        let catalog = sample_catalog(4);
        assert_eq!(scheduler.due_items(&catalog, today), [1, 3, 4]);
        assert_eq!(scheduler.due_items(&catalog, day(2024, 3, 4)), [1, 2, 3, 4]);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = [
            SchedulerConfig {
                ease_floor: 0.0,
                ..Default::default()
            },
            SchedulerConfig {
                initial_ease: 1.0,
                ..Default::default()
            },
            SchedulerConfig {
                graduation_steps: vec![],
                ..Default::default()
            },
            SchedulerConfig {
                graduation_steps: vec![1, 0, 10],
                ..Default::default()
            },
            SchedulerConfig {
                hard_multiplier: f64::NAN,
                ..Default::default()
            },
            SchedulerConfig {
                adaptive: AdaptiveConfig {
                    window: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(Scheduler::new(config).is_err());
        }
    }

    #[test]
    fn config_reads_partial_json() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"easyMultiplier": 3.0, "adaptive": {"window": 10}}"#)
                .unwrap();
        assert_eq!(config.easy_multiplier, 3.0);
        assert_eq!(config.adaptive.window, 10);
        assert_eq!(config.adaptive.min_sample, 5);
        assert_eq!(config.graduation_steps, [1, 6, 10]);
        config.validate().unwrap();
    }
}
