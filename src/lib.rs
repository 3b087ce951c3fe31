mod catalog;
mod clock;
mod deck;
mod error;
mod review;
mod scheduler;
mod session;
mod store;
#[cfg(test)]
mod test_helpers;

pub use catalog::{Catalog, ItemId, VocabularyItem};
pub use clock::{Clock, FixedClock, SystemClock};
pub use deck::{DEFAULT_DECK_CAP, DailyDeck, DeckBuilder, DeckConfig};
pub use error::{Result, SrsError};
pub use review::{MasteryTier, Rating, ReviewState, ReviewTable};
pub use scheduler::{
    AdaptiveConfig, Adjustment, DEFAULT_INITIAL_EASE, MIN_EASE_FACTOR, RatingOutcome, Scheduler,
    SchedulerConfig,
};
pub use session::{SessionConfig, StudySession};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StorageKeys};
