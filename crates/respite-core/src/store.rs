//! Persistence seam and the manager that drives the aggregator through it.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::stats::{RestEvent, StatisticsStore, StatsAggregator, Summary};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Single named slot holding the statistics blob.
///
/// `load` returns `Ok(None)` when nothing usable is stored; unreadable or
/// corrupt content counts as nothing stored.
pub trait StatsRepository {
    fn load(&self) -> Result<Option<StatisticsStore>>;
    fn save(&self, store: &StatisticsStore) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    slot: Mutex<Option<StatisticsStore>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: StatisticsStore) -> Self {
        Self {
            slot: Mutex::new(Some(store)),
        }
    }
}

impl StatsRepository for MemoryRepository {
    fn load(&self) -> Result<Option<StatisticsStore>> {
        let guard = self
            .slot
            .lock()
            .map_err(|e| Error::persistence(format!("mutex poisoned: {e}")))?;
        Ok(guard.clone())
    }

    fn save(&self, store: &StatisticsStore) -> Result<()> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|e| Error::persistence(format!("mutex poisoned: {e}")))?;
        *guard = Some(store.clone());
        Ok(())
    }
}

/// Loads, mutates and saves the statistics slot. Every mutation is
/// applied to a copy that is returned only once the save succeeded.
pub struct StatisticsManager<R, C = SystemClock> {
    repository: R,
    clock: C,
    aggregator: StatsAggregator,
}

impl<R: StatsRepository, C: Clock> StatisticsManager<R, C> {
    pub fn new(repository: R, clock: C, aggregator: StatsAggregator) -> Self {
        Self {
            repository,
            clock,
            aggregator,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn aggregator(&self) -> StatsAggregator {
        self.aggregator
    }

    /// Writes the zero state when the slot is empty.
    pub fn init(&self) -> Result<StatisticsStore> {
        if let Some(store) = self.repository.load()? {
            return Ok(store);
        }
        let store = StatisticsStore::new(self.clock.now());
        self.repository.save(&store)?;
        tracing::info!(first_use = %store.first_use_date, "initialized rest statistics");
        Ok(store)
    }

    pub fn record_rest(&self, duration_minutes: u32) -> Result<StatisticsStore> {
        let event = RestEvent::new(duration_minutes)?;
        let now = self.clock.now();
        let mut store = self.current(now)?;
        self.aggregator.record_event(&mut store, &event, now);
        self.repository.save(&store)?;
        tracing::debug!(
            minutes = duration_minutes,
            total = store.total_rest_count,
            "recorded rest"
        );
        Ok(store)
    }

    pub fn summary(&self) -> Result<Summary> {
        let now = self.clock.now();
        let store = self.current(now)?;
        Ok(self.aggregator.summarize(&store, now))
    }

    pub fn clear(&self) -> Result<StatisticsStore> {
        let store = StatisticsStore::new(self.clock.now());
        self.repository.save(&store)?;
        tracing::info!("cleared rest statistics");
        Ok(store)
    }

    fn current(&self, now: DateTime<Utc>) -> Result<StatisticsStore> {
        Ok(self
            .repository
            .load()?
            .unwrap_or_else(|| StatisticsStore::new(now)))
    }
}
