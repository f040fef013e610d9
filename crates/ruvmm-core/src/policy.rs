//! Replacement policies
//!
//! The four page-replacement algorithms and their bookkeeping. The set is
//! closed, so the state is a single enum with one implementation of
//! enroll/touch/select/rebuild per variant, dispatched once per call instead
//! of re-branching on a name at every site.
//!
//! Bookkeeping is kept exact: a page is tracked here iff it is resident, so
//! victim selection never has to skip stale entries.

use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::addr::{FrameId, PageKey, Pid};
use crate::error::EngineError;
use crate::frame::FrameTable;

/// The fixed set of replacement algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "FIFO")]
    Fifo,
    #[serde(rename = "LRU")]
    Lru,
    Clock,
    Optimal,
}

impl Algorithm {
    /// All algorithms, in comparison-report order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Fifo,
        Algorithm::Lru,
        Algorithm::Clock,
        Algorithm::Optimal,
    ];

    /// Dense index for per-policy counter arrays.
    #[inline]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Canonical display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Algorithm::Fifo => "FIFO",
            Algorithm::Lru => "LRU",
            Algorithm::Clock => "Clock",
            Algorithm::Optimal => "Optimal",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Algorithm::Fifo),
            "lru" => Ok(Algorithm::Lru),
            "clock" => Ok(Algorithm::Clock),
            "optimal" => Ok(Algorithm::Optimal),
            _ => Err(EngineError::InvalidAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// One resident frame as seen by victim selection, in frame order.
#[derive(Debug, Clone, Copy)]
pub struct ResidentPage {
    pub frame: FrameId,
    pub key: PageKey,
    pub load_tick: u64,
    pub access_tick: u64,
}

/// Why a victim was chosen. Carried into the translation trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum VictimReason {
    /// Oldest page in the FIFO load-order queue.
    FifoOldest,
    /// Smallest last-touch timestamp.
    LruColdest,
    /// First frame found with a cleared reference bit.
    ClockSecondChance,
    /// Resident page that never reappears in the lookahead.
    OptimalNeverUsed,
    /// Resident page whose next use lies furthest ahead.
    OptimalFurthest { next_use: usize },
    /// Oldest load tick over the resident set (FIFO-order fallback).
    OldestLoadFallback,
}

impl std::fmt::Display for VictimReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VictimReason::FifoOldest => f.write_str("oldest page in FIFO queue"),
            VictimReason::LruColdest => f.write_str("least recently used page"),
            VictimReason::ClockSecondChance => f.write_str("reference bit 0 under clock hand"),
            VictimReason::OptimalNeverUsed => f.write_str("page is never used again"),
            VictimReason::OptimalFurthest { next_use } => {
                write!(f, "next use is furthest in the future (step {next_use})")
            }
            VictimReason::OldestLoadFallback => f.write_str("oldest loaded page (FIFO fallback)"),
        }
    }
}

/// A selected eviction victim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    pub key: PageKey,
    pub frame: FrameId,
    pub reason: VictimReason,
}

/// Active bookkeeping for the current algorithm.
///
/// Rebuilt from the resident set whenever the algorithm is switched; see
/// [`ReplacementState::rebuild`].
#[derive(Debug, Clone)]
pub enum ReplacementState {
    /// Load-order queue of (page, frame).
    Fifo { queue: VecDeque<(PageKey, FrameId)> },
    /// Last-touch tick per resident page.
    Lru { stamps: BTreeMap<PageKey, u64> },
    /// Reference bit per resident page plus the shared scan hand.
    Clock {
        bits: BTreeMap<PageKey, bool>,
        pointer: usize,
    },
    /// Optimal keeps no state between faults; it works off the lookahead.
    Optimal,
}

impl ReplacementState {
    /// Empty state for an algorithm.
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Fifo => ReplacementState::Fifo {
                queue: VecDeque::new(),
            },
            Algorithm::Lru => ReplacementState::Lru {
                stamps: BTreeMap::new(),
            },
            Algorithm::Clock => ReplacementState::Clock {
                bits: BTreeMap::new(),
                pointer: 0,
            },
            Algorithm::Optimal => ReplacementState::Optimal,
        }
    }

    /// Which algorithm this state belongs to.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            ReplacementState::Fifo { .. } => Algorithm::Fifo,
            ReplacementState::Lru { .. } => Algorithm::Lru,
            ReplacementState::Clock { .. } => Algorithm::Clock,
            ReplacementState::Optimal => Algorithm::Optimal,
        }
    }

    /// Rebuild bookkeeping from the current resident set.
    ///
    /// FIFO is ordered by load tick (ties by frame index), LRU seeded from
    /// access ticks, Clock starts with every bit set and the hand at zero.
    pub fn rebuild(algorithm: Algorithm, residents: &[ResidentPage]) -> Self {
        match algorithm {
            Algorithm::Fifo => {
                let mut ordered: Vec<&ResidentPage> = residents.iter().collect();
                ordered.sort_by_key(|r| (r.load_tick, r.frame));
                ReplacementState::Fifo {
                    queue: ordered.into_iter().map(|r| (r.key, r.frame)).collect(),
                }
            }
            Algorithm::Lru => ReplacementState::Lru {
                stamps: residents.iter().map(|r| (r.key, r.access_tick)).collect(),
            },
            Algorithm::Clock => ReplacementState::Clock {
                bits: residents.iter().map(|r| (r.key, true)).collect(),
                pointer: 0,
            },
            Algorithm::Optimal => ReplacementState::Optimal,
        }
    }

    /// Enroll a page that just became resident.
    pub fn enroll(&mut self, key: PageKey, frame: FrameId, now: u64) {
        match self {
            ReplacementState::Fifo { queue } => queue.push_back((key, frame)),
            ReplacementState::Lru { stamps } => {
                stamps.insert(key, now);
            }
            ReplacementState::Clock { bits, .. } => {
                bits.insert(key, true);
            }
            ReplacementState::Optimal => {}
        }
    }

    /// Note an access to a resident page.
    pub fn touch(&mut self, key: PageKey, now: u64) {
        match self {
            ReplacementState::Fifo { .. } => {}
            ReplacementState::Lru { stamps } => {
                stamps.insert(key, now);
            }
            ReplacementState::Clock { bits, .. } => {
                bits.insert(key, true);
            }
            ReplacementState::Optimal => {}
        }
    }

    /// Drop every entry belonging to `pid` (process termination).
    pub fn remove_pid(&mut self, pid: Pid) {
        match self {
            ReplacementState::Fifo { queue } => queue.retain(|(key, _)| key.pid != pid),
            ReplacementState::Lru { stamps } => stamps.retain(|key, _| key.pid != pid),
            ReplacementState::Clock { bits, .. } => bits.retain(|key, _| key.pid != pid),
            ReplacementState::Optimal => {}
        }
    }

    /// Select (and untrack) an eviction victim.
    ///
    /// `residents` is the resident set in ascending frame order. `lookahead`
    /// is consumed only by Optimal. Returns `None` only when nothing is
    /// resident at all.
    pub fn select_victim(
        &mut self,
        frames: &FrameTable,
        residents: &[ResidentPage],
        lookahead: Option<&[PageKey]>,
    ) -> Option<Victim> {
        match self {
            ReplacementState::Fifo { queue } => {
                let (key, frame) = queue.pop_front()?;
                debug_assert_eq!(frames.owner(frame), Some(key));
                Some(Victim {
                    key,
                    frame,
                    reason: VictimReason::FifoOldest,
                })
            }
            ReplacementState::Lru { stamps } => {
                let key = stamps
                    .iter()
                    .min_by_key(|&(key, stamp)| (*stamp, *key))
                    .map(|(key, _)| *key)?;
                stamps.remove(&key);
                let frame = residents.iter().find(|r| r.key == key)?.frame;
                Some(Victim {
                    key,
                    frame,
                    reason: VictimReason::LruColdest,
                })
            }
            ReplacementState::Clock { bits, pointer } => {
                let total = frames.total();
                if total == 0 {
                    return None;
                }
                // Two full laps: the first clears set bits, the second must
                // then land on a cleared one if anything is resident.
                for _ in 0..2 * total {
                    let at = *pointer;
                    if let Some(key) = frames.owner(FrameId::new(at as u32)) {
                        let referenced = bits.get(&key).copied().unwrap_or(false);
                        if !referenced {
                            *pointer = (at + 1) % total;
                            bits.remove(&key);
                            return Some(Victim {
                                key,
                                frame: FrameId::new(at as u32),
                                reason: VictimReason::ClockSecondChance,
                            });
                        }
                        bits.insert(key, false);
                    }
                    *pointer = (at + 1) % total;
                }
                oldest_load_fallback(residents)
            }
            ReplacementState::Optimal => {
                let future = match lookahead {
                    Some(future) if !future.is_empty() => future,
                    _ => return oldest_load_fallback(residents),
                };
                let mut furthest: Option<(usize, &ResidentPage)> = None;
                for resident in residents {
                    match future.iter().position(|key| *key == resident.key) {
                        // Never referenced again: provably safe to evict now.
                        None => {
                            return Some(Victim {
                                key: resident.key,
                                frame: resident.frame,
                                reason: VictimReason::OptimalNeverUsed,
                            });
                        }
                        Some(next_use) => {
                            if furthest.map_or(true, |(best, _)| next_use > best) {
                                furthest = Some((next_use, resident));
                            }
                        }
                    }
                }
                furthest.map(|(next_use, resident)| Victim {
                    key: resident.key,
                    frame: resident.frame,
                    reason: VictimReason::OptimalFurthest { next_use },
                })
            }
        }
    }
}

/// FIFO-order fallback used when Clock finds no cleared bit within its lap
/// bound and when Optimal runs without a lookahead: evict the page loaded
/// longest ago, ties broken by frame index.
fn oldest_load_fallback(residents: &[ResidentPage]) -> Option<Victim> {
    residents
        .iter()
        .min_by_key(|r| (r.load_tick, r.frame))
        .map(|r| Victim {
            key: r.key,
            frame: r.frame,
            reason: VictimReason::OldestLoadFallback,
        })
}
