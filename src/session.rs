use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ItemId, VocabularyItem};
use crate::clock::Clock;
use crate::deck::{DailyDeck, DeckBuilder, DeckConfig};
use crate::error::{InvalidConfigSnafu, Result};
use crate::review::{Rating, ReviewState};
use crate::scheduler::{RatingOutcome, Scheduler, SchedulerConfig};
use crate::store::{KeyValueStore, StorageKeys};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    pub scheduler: SchedulerConfig,
    pub deck: DeckConfig,
    pub keys: StorageKeys,
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            InvalidConfigSnafu {
                reason: err.to_string(),
            }
            .build()
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.deck.validate()
    }
}

/// One learner's study context: owns the store, the clock and the catalog
/// and routes each rating through the scheduler and the deck builder.
pub struct StudySession<S, C> {
    store: S,
    clock: C,
    catalog: Catalog,
    scheduler: Scheduler,
    decks: DeckBuilder,
}

impl<S: KeyValueStore, C: Clock> StudySession<S, C> {
    pub fn open(config: SessionConfig, store: S, clock: C, catalog: Catalog) -> Result<Self> {
        config.validate()?;
        let SessionConfig {
            scheduler,
            deck,
            keys,
        } = config;
        let scheduler = Scheduler::load(scheduler, &keys, &store)?;
        Ok(Self {
            store,
            clock,
            catalog,
            scheduler,
            decks: DeckBuilder::new(deck, keys),
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Today's deck, rebuilt when the calendar day has changed.
    pub fn deck(&mut self) -> &DailyDeck {
        let today = self.clock.today();
        self.decks
            .build_or_load(&mut self.store, &self.scheduler, &self.catalog, today)
    }

    /// The first item of today's deck that has not been rated yet.
    pub fn next_item(&mut self) -> Option<&VocabularyItem> {
        let id = self.deck().remaining().next()?;
        self.catalog.get(id)
    }

    /// Schedules `id` and marks it completed in today's deck. `persisted`
    /// covers both the review table and the deck writes.
    pub fn rate(&mut self, id: ItemId, rating: Rating) -> RatingOutcome {
        self.deck();
        let today = self.clock.today();
        let mut outcome = self.scheduler.rate(&mut self.store, id, rating, today);
        self.decks.mark_completed(&mut self.store, id);
        outcome.persisted &= self.decks.is_persisted();
        outcome
    }

    /// Like [`StudySession::rate`] for a free-form label; anything other than
    /// easy or hard is taken as medium.
    pub fn rate_label(&mut self, id: ItemId, label: &str) -> RatingOutcome {
        self.rate(id, Rating::from_label(label))
    }

    pub fn reroll(&mut self) -> &DailyDeck {
        let today = self.clock.today();
        self.decks.reroll(&mut self.store, &self.catalog, today)
    }

    pub fn reset_progress(&mut self) {
        self.deck();
        self.decks.reset_progress(&mut self.store);
    }

    pub fn is_complete(&mut self) -> bool {
        self.deck();
        self.decks.is_session_complete()
    }

    pub fn review_state(&self, id: ItemId) -> Option<&ReviewState> {
        self.scheduler.review_state(id)
    }

    pub fn days_until_due(&self, id: ItemId) -> Option<i64> {
        self.scheduler.days_until_due(id, self.clock.today())
    }

    /// Retries writing the review table and the current deck, e.g. after a
    /// rating reported `persisted: false`.
    pub fn persist(&mut self) -> bool {
        let states = self.scheduler.persist(&mut self.store);
        let deck = self.decks.persist(&mut self.store);
        states && deck
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
