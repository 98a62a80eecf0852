//! Ledger of recently ingested areas.
//!
//! Sparse rural areas can stay below the density floor even after a full
//! ingestion. Without the ledger every route request there would re-query the
//! provider and append another copy of the same edges.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use detour_core::{BoundingBox, IngestSummary};

const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct IngestRecord {
    pub bbox: BoundingBox,
    pub summary: IngestSummary,
    pub ingested_at: Instant,
}

#[derive(Debug)]
pub struct IngestLedger {
    entries: DashMap<String, IngestRecord>,
    cooldown: Duration,
    max_entries: usize,
}

impl IngestLedger {
    pub fn new(cooldown: Duration) -> Self {
        Self::with_capacity(cooldown, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(cooldown: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            cooldown,
            max_entries: max_entries.max(1),
        }
    }

    /// Record of an area containing `bbox` ingested within the cooldown.
    pub fn covering(&self, bbox: &BoundingBox) -> Option<IngestRecord> {
        if self.cooldown.is_zero() {
            return None;
        }
        let now = Instant::now();
        self.entries
            .iter()
            .map(|entry| *entry.value())
            .find(|record| {
                now.duration_since(record.ingested_at) <= self.cooldown
                    && record.bbox.contains(bbox.min_lat, bbox.min_lng)
                    && record.bbox.contains(bbox.max_lat, bbox.max_lng)
            })
    }

    pub fn record(&self, bbox: &BoundingBox, summary: IngestSummary) {
        self.entries.insert(
            bbox.cache_key(),
            IngestRecord {
                bbox: *bbox,
                summary,
                ingested_at: Instant::now(),
            },
        );
        self.prune();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired records, then the oldest ones beyond capacity.
    pub fn prune(&self) {
        let now = Instant::now();
        let mut entries: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().ingested_at))
            .collect();

        for (key, ingested_at) in &entries {
            if now.duration_since(*ingested_at) > self.cooldown {
                self.entries.remove(key);
            }
        }

        if self.entries.len() <= self.max_entries {
            return;
        }

        entries.sort_by_key(|(_, ingested_at)| *ingested_at);
        for (key, _) in entries {
            if self.entries.len() <= self.max_entries {
                break;
            }
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> BoundingBox {
        BoundingBox::new(min_lat, min_lng, max_lat, max_lng).unwrap()
    }

    #[test]
    fn recorded_area_covers_inner_boxes() {
        let ledger = IngestLedger::new(Duration::from_secs(60));
        let summary = IngestSummary {
            nodes_ingested: 4,
            ways_processed: 2,
            edges_inserted: 6,
        };
        ledger.record(&bbox(0.0, 0.0, 1.0, 1.0), summary);

        let record = ledger.covering(&bbox(0.2, 0.2, 0.8, 0.8)).expect("covered");
        assert_eq!(record.summary, summary);
        assert!(ledger.covering(&bbox(0.5, 0.5, 1.5, 1.5)).is_none());
    }

    #[test]
    fn zero_cooldown_disables_ledger() {
        let ledger = IngestLedger::new(Duration::ZERO);
        let area = bbox(0.0, 0.0, 1.0, 1.0);
        ledger.record(&area, IngestSummary::default());
        assert!(ledger.covering(&area).is_none());
    }

    #[test]
    fn oldest_records_are_evicted_beyond_capacity() {
        let ledger = IngestLedger::with_capacity(Duration::from_secs(60), 2);
        for offset in 0..4 {
            let start = offset as f64;
            ledger.record(&bbox(start, start, start + 0.5, start + 0.5), IngestSummary::default());
        }
        assert_eq!(ledger.len(), 2);
        assert!(ledger.covering(&bbox(3.1, 3.1, 3.2, 3.2)).is_some());
    }
}
