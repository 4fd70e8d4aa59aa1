//! Ordered lap checkpoints with derived split queries.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{TimerError, TimerResult};

/// One recorded checkpoint of a stopwatch session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LapRecord {
    /// 1-based position in the ledger
    pub sequence: u32,
    /// Time since the previous lap, or since start for the first one
    pub split_ms: u64,
    /// Total elapsed time when the lap was recorded
    pub cumulative_ms: u64,
}

/// Append-only list of laps. Cumulative times never decrease and
/// sequence numbers have no gaps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LapLedger {
    laps: Vec<LapRecord>,
}

impl LapLedger {
    pub fn new() -> Self {
        Self { laps: Vec::new() }
    }

    /// Rebuild a ledger from stored records, checking its invariants.
    pub fn from_records(laps: Vec<LapRecord>) -> TimerResult<Self> {
        let mut previous = 0u64;
        for (idx, lap) in laps.iter().enumerate() {
            if lap.sequence as usize != idx + 1 {
                return Err(TimerError::InvalidSnapshot("lap sequence has gaps"));
            }
            if lap.cumulative_ms < previous {
                return Err(TimerError::InvalidSnapshot("lap times go backwards"));
            }
            if lap.split_ms != lap.cumulative_ms - previous {
                return Err(TimerError::InvalidSnapshot("lap split does not match"));
            }
            previous = lap.cumulative_ms;
        }
        Ok(Self { laps })
    }

    /// Append a checkpoint at `cumulative_ms`. Returns `None` without
    /// recording when that would put the ledger out of order.
    pub(crate) fn push(&mut self, cumulative_ms: u64) -> Option<&LapRecord> {
        let previous = self.last().map(|l| l.cumulative_ms).unwrap_or(0);
        if cumulative_ms < previous {
            return None;
        }
        self.laps.push(LapRecord {
            sequence: self.laps.len() as u32 + 1,
            split_ms: cumulative_ms - previous,
            cumulative_ms,
        });
        self.laps.last()
    }

    pub(crate) fn clear(&mut self) {
        self.laps.clear();
    }

    /// Lap with the shortest split; the earliest one wins a tie.
    pub fn fastest(&self) -> Option<&LapRecord> {
        self.laps.iter().fold(None, |best: Option<&LapRecord>, lap| match best {
            Some(b) if b.split_ms <= lap.split_ms => Some(b),
            _ => Some(lap),
        })
    }

    /// Lap with the longest split; the earliest one wins a tie.
    pub fn slowest(&self) -> Option<&LapRecord> {
        self.laps.iter().fold(None, |best: Option<&LapRecord>, lap| match best {
            Some(b) if b.split_ms >= lap.split_ms => Some(b),
            _ => Some(lap),
        })
    }

    pub fn last(&self) -> Option<&LapRecord> {
        self.laps.last()
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LapRecord> {
        self.laps.iter()
    }

    pub fn as_slice(&self) -> &[LapRecord] {
        &self.laps
    }
}

impl<'a> IntoIterator for &'a LapLedger {
    type Item = &'a LapRecord;
    type IntoIter = std::slice::Iter<'a, LapRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.laps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(cumulative: &[u64]) -> LapLedger {
        let mut ledger = LapLedger::new();
        for &c in cumulative {
            ledger.push(c).unwrap();
        }
        ledger
    }

    #[test]
    fn test_splits_derived_from_cumulative() {
        let ledger = build(&[2_000, 5_500, 9_000]);
        let splits: Vec<u64> = ledger.iter().map(|l| l.split_ms).collect();
        assert_eq!(splits, vec![2_000, 3_500, 3_500]);
        let seqs: Vec<u32> = ledger.iter().map(|l| l.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_fastest_slowest_tie_break_first() {
        // splits 3.0, 3.0, 5.0
        let ledger = build(&[3_000, 6_000, 11_000]);
        assert_eq!(ledger.fastest().unwrap().sequence, 1);
        assert_eq!(ledger.slowest().unwrap().sequence, 3);

        // splits 5.0, 2.0, 5.0
        let ledger = build(&[5_000, 7_000, 12_000]);
        assert_eq!(ledger.slowest().unwrap().sequence, 1);
        assert_eq!(ledger.fastest().unwrap().sequence, 2);
    }

    #[test]
    fn test_empty_ledger_has_no_extremes() {
        let ledger = LapLedger::new();
        assert!(ledger.fastest().is_none());
        assert!(ledger.slowest().is_none());
    }

    #[test]
    fn test_push_rejects_backwards() {
        let mut ledger = build(&[4_000]);
        assert!(ledger.push(3_999).is_none());
        assert_eq!(ledger.len(), 1);
        // Equal cumulative is a zero-length split, which is fine
        assert_eq!(ledger.push(4_000).unwrap().split_ms, 0);
    }

    #[test]
    fn test_from_records_validates() {
        let good = build(&[1_000, 2_500]);
        let rebuilt = LapLedger::from_records(good.as_slice().to_vec()).unwrap();
        assert_eq!(rebuilt, good);

        let mut gap = good.as_slice().to_vec();
        gap[1].sequence = 3;
        assert!(LapLedger::from_records(gap).is_err());

        let mut bad_split = good.as_slice().to_vec();
        bad_split[1].split_ms = 7;
        assert!(LapLedger::from_records(bad_split).is_err());
    }
}
