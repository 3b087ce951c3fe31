use std::collections::BTreeSet;

use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ItemId};
use crate::error::Result;
use crate::scheduler::{Scheduler, ensure};
use crate::store::{KeyValueStore, StorageKeys, load_json, save_json};

pub const DEFAULT_DECK_CAP: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeckConfig {
    /// Maximum number of items in a daily deck.
    pub cap: usize,
    /// Shuffle the due items before truncating to `cap`. Off by default, in
    /// which case the deck keeps catalog order.
    pub shuffle_due: bool,
    /// Fixed seed for shuffles and rerolls; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            cap: DEFAULT_DECK_CAP,
            shuffle_due: false,
            seed: None,
        }
    }
}

impl DeckConfig {
    pub fn validate(&self) -> Result<()> {
        ensure(self.cap > 0, "deck cap must be at least 1")
    }
}

/// The items presented on one calendar day and which of them were rated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyDeck {
    deck_date: NaiveDate,
    item_ids: Vec<ItemId>,
    completed_ids: BTreeSet<ItemId>,
}

impl DailyDeck {
    fn new(deck_date: NaiveDate, item_ids: Vec<ItemId>) -> Self {
        Self {
            deck_date,
            item_ids,
            completed_ids: BTreeSet::new(),
        }
    }

    pub fn deck_date(&self) -> NaiveDate {
        self.deck_date
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn completed_ids(&self) -> &BTreeSet<ItemId> {
        &self.completed_ids
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.item_ids.contains(&id)
    }

    /// Items not yet rated this period, in deck order.
    pub fn remaining(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.item_ids
            .iter()
            .copied()
            .filter(|id| !self.completed_ids.contains(id))
    }

    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    /// The deck holds at most `cap` items, so having completed all of them
    /// is the same as having reached `min(cap, available)`.
    pub fn is_complete(&self) -> bool {
        self.completed_ids.len() >= self.item_ids.len()
    }
}

/// Builds one deck per calendar day and tracks completion within it.
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    config: DeckConfig,
    keys: StorageKeys,
    deck: Option<DailyDeck>,
    rng: StdRng,
    unsaved: bool,
}

impl DeckBuilder {
    pub fn new(config: DeckConfig, keys: StorageKeys) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            keys,
            deck: None,
            rng,
            unsaved: false,
        }
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub fn deck(&self) -> Option<&DailyDeck> {
        self.deck.as_ref()
    }

    /// False while a deck or completion write has been rejected by the store
    /// and not yet retried with [`DeckBuilder::persist`].
    pub fn is_persisted(&self) -> bool {
        !self.unsaved
    }

    /// Returns today's deck, building it on the first call of the day. A deck
    /// persisted earlier the same day is picked up from the store.
    pub fn build_or_load(
        &mut self,
        store: &mut impl KeyValueStore,
        scheduler: &Scheduler,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> &DailyDeck {
        let current = self
            .deck
            .as_ref()
            .is_some_and(|deck| deck.deck_date == today);
        if !current {
            let deck = match self.restore(&*store, catalog, today) {
                Some(deck) => deck,
                None => {
                    let deck = self.build(scheduler, catalog, today);
                    self.unsaved = !self.save(store, &deck);
                    deck
                }
            };
            self.deck = Some(deck);
        }
        self.deck.get_or_insert_with(|| DailyDeck::new(today, Vec::new()))
    }

    /// Replaces today's deck with a random subset of the catalog, ignoring
    /// due status, and clears completion.
    pub fn reroll(
        &mut self,
        store: &mut impl KeyValueStore,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> &DailyDeck {
        let mut ids: Vec<ItemId> = catalog.ids().collect();
        ids.shuffle(&mut self.rng);
        ids.truncate(self.config.cap);
        info!("rerolled deck for {today}: {} items", ids.len());

        let deck = DailyDeck::new(today, ids);
        self.unsaved = !self.save(store, &deck);
        self.deck.insert(deck)
    }

    /// Records a rating for `id` in the current period. Ids outside the deck
    /// and repeats are ignored; returns whether anything was recorded in
    /// memory. A rejected write shows up in [`DeckBuilder::is_persisted`].
    pub fn mark_completed(&mut self, store: &mut impl KeyValueStore, id: ItemId) -> bool {
        let Some(deck) = self.deck.as_mut() else {
            return false;
        };
        if !deck.contains(id) || !deck.completed_ids.insert(id) {
            return false;
        }
        debug!(
            "item {id} completed ({}/{})",
            deck.completed_ids.len(),
            deck.item_ids.len()
        );
        if !save_json(store, &self.keys.completed_ids, &deck.completed_ids) {
            self.unsaved = true;
        }
        true
    }

    /// True once every item in the deck has been rated. Trivially true for an
    /// empty deck or before any deck was built.
    pub fn is_session_complete(&self) -> bool {
        self.deck.as_ref().is_none_or(DailyDeck::is_complete)
    }

    /// Starts the current deck over without rebuilding it.
    pub fn reset_progress(&mut self, store: &mut impl KeyValueStore) {
        if let Some(deck) = self.deck.as_mut() {
            deck.completed_ids.clear();
            if !save_json(store, &self.keys.completed_ids, &deck.completed_ids) {
                self.unsaved = true;
            }
        }
    }

    /// Writes the current deck to the store.
    pub fn persist(&mut self, store: &mut impl KeyValueStore) -> bool {
        let saved = match &self.deck {
            Some(deck) => self.save(store, deck),
            None => true,
        };
        self.unsaved = !saved;
        saved
    }

    fn build(&mut self, scheduler: &Scheduler, catalog: &Catalog, today: NaiveDate) -> DailyDeck {
        let cap = self.config.cap;
        let mut due = scheduler.due_items(catalog, today);
        let ids = if due.is_empty() {
            debug!("nothing due on {today}, falling back to catalog order");
            catalog.ids().take(cap).collect()
        } else {
            if self.config.shuffle_due {
                due.shuffle(&mut self.rng);
            }
            due.truncate(cap);
            due
        };
        info!("built deck for {today}: {} of {} items", ids.len(), catalog.len());
        DailyDeck::new(today, ids)
    }

    fn restore(
        &self,
        store: &impl KeyValueStore,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Option<DailyDeck> {
        let raw_date = store.load(&self.keys.deck_date)?;
        let deck_date = parse_date(&raw_date)?;
        if deck_date != today {
            return None;
        }
        let ids: Vec<ItemId> = load_json(store, &self.keys.deck_ids)?;
        let item_ids: Vec<ItemId> = ids
            .into_iter()
            .unique()
            .filter(|id| catalog.get(*id).is_some())
            .take(self.config.cap)
            .collect();
        if item_ids.is_empty() && !catalog.is_empty() {
            debug!("stored deck for {today} has no items left in the catalog, rebuilding");
            return None;
        }
        let completed_ids = load_json::<Vec<ItemId>>(store, &self.keys.completed_ids)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| item_ids.contains(id))
            .collect();
        debug!("restored deck for {today}: {} items", item_ids.len());
        Some(DailyDeck {
            deck_date,
            item_ids,
            completed_ids,
        })
    }

    fn save(&self, store: &mut impl KeyValueStore, deck: &DailyDeck) -> bool {
        let date = save_json(store, &self.keys.deck_date, &deck.deck_date);
        let ids = save_json(store, &self.keys.deck_ids, &deck.item_ids);
        let completed = save_json(store, &self.keys.completed_ids, &deck.completed_ids);
        date && ids && completed
    }
}

/// Accepts both a JSON string and a bare `YYYY-MM-DD`.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim().trim_matches('"');
    match text.parse() {
        Ok(day) => Some(day),
        Err(err) => {
            warn!("ignoring stored deck date `{text}`: {err}");
            None
        }
    }
}
