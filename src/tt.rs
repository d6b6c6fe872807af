//! Shared transposition table.
//!
//! A bucketed cache of search results keyed by Zobrist hash, shared by all
//! worker threads without locking. Each slot is two relaxed atomic words;
//! a torn read produces a `hash16` mismatch and the probe simply misses.
//! Entries age through a 6-bit generation bumped once per search.

use std::mem;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::board::Move;
use crate::search::constants::{MATED_IN_MAX, MATE_IN_MAX};

/// Bound type of a stored value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bound {
    None = 0,
    Lower = 1,
    Upper = 2,
    Exact = 3,
}

impl Bound {
    fn from_bits(bits: u8) -> Bound {
        match bits & 0x3 {
            1 => Bound::Lower,
            2 => Bound::Upper,
            3 => Bound::Exact,
            _ => Bound::None,
        }
    }
}

/// A successful probe.
#[derive(Clone, Copy, Debug)]
pub struct TTHit {
    pub mv: Move,
    pub value: i32,
    pub eval: i32,
    pub depth: i32,
    pub bound: Bound,
}

const SLOTS_PER_BUCKET: usize = 3;
const GENERATION_CYCLE: u8 = 64;

/// One entry, packed into two atomic words:
/// - `data`: hash16 | move | value | eval, 16 bits each
/// - `meta`: depth (8 bits) | generation·bound (8 bits)
#[derive(Default)]
struct TTSlot {
    data: AtomicU64,
    meta: AtomicU64,
}

impl TTSlot {
    #[inline]
    fn load(&self) -> (u64, u64) {
        (
            self.data.load(Ordering::Relaxed),
            self.meta.load(Ordering::Relaxed),
        )
    }
}

#[repr(align(64))]
#[derive(Default)]
struct TTBucket {
    slots: [TTSlot; SLOTS_PER_BUCKET],
}

pub struct TranspositionTable {
    buckets: Vec<TTBucket>,
    hash_mask: u64,
    generation: AtomicU8,
}

#[inline]
fn pack_data(hash16: u16, mv: Move, value: i32, eval: i32) -> u64 {
    u64::from(hash16)
        | (u64::from(mv.as_u16()) << 16)
        | (u64::from(value as i16 as u16) << 32)
        | (u64::from(eval as i16 as u16) << 48)
}

#[inline]
fn pack_meta(depth: i32, generation: u8, bound: Bound) -> u64 {
    u64::from(depth as i8 as u8) | (u64::from((generation << 2) | bound as u8) << 8)
}

#[inline]
fn unpack_genbound(meta: u64) -> (u8, Bound) {
    let byte = ((meta >> 8) & 0xFF) as u8;
    (byte >> 2, Bound::from_bits(byte))
}

impl TranspositionTable {
    /// Allocate approximately `megabytes` MiB, rounded down to a power of
    /// two buckets. On allocation failure the size is halved and retried;
    /// only the minimum size failing is fatal.
    #[must_use]
    pub fn new(megabytes: usize) -> Self {
        let mut megabytes = megabytes.max(1);
        loop {
            let wanted = (megabytes << 20) / mem::size_of::<TTBucket>();
            let count = if wanted.is_power_of_two() {
                wanted
            } else {
                wanted.next_power_of_two() / 2
            };
            let count = count.max(1);

            let mut buckets: Vec<TTBucket> = Vec::new();
            if buckets.try_reserve_exact(count).is_ok() {
                buckets.extend((0..count).map(|_| TTBucket::default()));
                return TranspositionTable {
                    buckets,
                    hash_mask: count as u64 - 1,
                    generation: AtomicU8::new(0),
                };
            }

            assert!(megabytes > 1, "cannot allocate minimum transposition table");
            megabytes /= 2;
        }
    }

    /// Table capacity in MiB, as actually allocated.
    #[must_use]
    pub fn size_megabytes(&self) -> usize {
        self.buckets.len() * mem::size_of::<TTBucket>() >> 20
    }

    /// Zero every entry.
    pub fn clear(&self) {
        for bucket in &self.buckets {
            for slot in &bucket.slots {
                slot.data.store(0, Ordering::Relaxed);
                slot.meta.store(0, Ordering::Relaxed);
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Advance the generation; called once at the start of each search.
    pub fn update(&self) {
        let next = (self.generation.load(Ordering::Relaxed) + 1) % GENERATION_CYCLE;
        self.generation.store(next, Ordering::Relaxed);
    }

    #[inline]
    fn bucket_for(&self, hash: u64) -> &TTBucket {
        &self.buckets[(hash & self.hash_mask) as usize]
    }

    /// Look up `hash`. A hit refreshes the entry's generation and converts
    /// any mate score to be relative to `height`.
    #[must_use]
    pub fn probe(&self, hash: u64, height: usize) -> Option<TTHit> {
        let hash16 = (hash >> 48) as u16;
        let generation = self.generation.load(Ordering::Relaxed);

        for slot in &self.bucket_for(hash).slots {
            let (data, meta) = slot.load();
            if (data & 0xFFFF) as u16 != hash16 {
                continue;
            }
            let (_, bound) = unpack_genbound(meta);
            if bound == Bound::None {
                continue;
            }

            // Refresh the age, keeping the bound bits
            slot.meta.store(
                (meta & !(0xFCu64 << 8)) | (u64::from(generation) << 10),
                Ordering::Relaxed,
            );

            return Some(TTHit {
                mv: Move::from_u16(((data >> 16) & 0xFFFF) as u16),
                value: value_from_tt(((data >> 32) & 0xFFFF) as u16 as i16 as i32, height),
                eval: ((data >> 48) & 0xFFFF) as u16 as i16 as i32,
                depth: i32::from((meta & 0xFF) as u8 as i8),
                bound,
            });
        }
        None
    }

    /// Store an entry, preferring an exact `hash16` match, otherwise the
    /// slot with the worst `depth - 8 * age` replacement score.
    pub fn store(
        &self,
        hash: u64,
        mv: Move,
        value: i32,
        eval: i32,
        depth: i32,
        bound: Bound,
        height: usize,
    ) {
        let hash16 = (hash >> 48) as u16;
        let generation = self.generation.load(Ordering::Relaxed);
        let bucket = self.bucket_for(hash);

        let mut victim = 0;
        let mut worst = i32::MAX;
        let mut matched = false;

        for (i, slot) in bucket.slots.iter().enumerate() {
            let (data, meta) = slot.load();
            if (data & 0xFFFF) as u16 == hash16 {
                victim = i;
                matched = true;
                break;
            }
            let (slot_gen, _) = unpack_genbound(meta);
            let slot_depth = i32::from((meta & 0xFF) as u8 as i8);
            let age = i32::from(generation.wrapping_sub(slot_gen) % GENERATION_CYCLE);
            let score = slot_depth - 8 * age;
            if score < worst {
                worst = score;
                victim = i;
            }
        }

        let slot = &bucket.slots[victim];
        // Keep the old move when a re-store of the same position has none
        let mv = if mv.is_none() && matched {
            Move::from_u16(((slot.data.load(Ordering::Relaxed) >> 16) & 0xFFFF) as u16)
        } else {
            mv
        };

        slot.data.store(
            pack_data(hash16, mv, value_to_tt(value, height), eval),
            Ordering::Relaxed,
        );
        slot.meta
            .store(pack_meta(depth, generation, bound), Ordering::Relaxed);
    }

    /// Per-mille of sampled slots that belong to the current generation.
    #[must_use]
    pub fn hashfull(&self) -> usize {
        let generation = self.generation.load(Ordering::Relaxed);
        let sampled = self.buckets.len().min(1000);
        let mut used = 0;

        for bucket in &self.buckets[..sampled] {
            for slot in &bucket.slots {
                let (gen, bound) = unpack_genbound(slot.meta.load(Ordering::Relaxed));
                if bound != Bound::None && gen == generation {
                    used += 1;
                }
            }
        }
        used * 1000 / (sampled * SLOTS_PER_BUCKET)
    }
}

/// Mate scores are stored relative to the probing node, not the root, so
/// they stay comparable across different search heights.
#[inline]
#[must_use]
pub fn value_to_tt(value: i32, height: usize) -> i32 {
    if value >= MATE_IN_MAX {
        value + height as i32
    } else if value <= MATED_IN_MAX {
        value - height as i32
    } else {
        value
    }
}

#[inline]
#[must_use]
pub fn value_from_tt(value: i32, height: usize) -> i32 {
    if value >= MATE_IN_MAX {
        value - height as i32
    } else if value <= MATED_IN_MAX {
        value + height as i32
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;
    use crate::search::constants::MATE;

    fn test_move() -> Move {
        Move::normal(
            Square::from_name("e2").unwrap(),
            Square::from_name("e4").unwrap(),
        )
    }

    #[test]
    fn test_bucket_layout() {
        assert_eq!(mem::size_of::<TTBucket>(), 64);
        assert_eq!(mem::align_of::<TTBucket>(), 64);
    }

    #[test]
    fn test_size_is_power_of_two() {
        for mb in [1, 2, 3, 7, 16] {
            let tt = TranspositionTable::new(mb);
            assert!(tt.buckets.len().is_power_of_two());
            assert!(tt.size_megabytes() <= mb);
        }
    }

    #[test]
    fn test_store_probe_roundtrip() {
        let tt = TranspositionTable::new(1);
        let hash = 0xDEAD_BEEF_CAFE_F00D;

        assert!(tt.probe(hash, 0).is_none());

        tt.store(hash, test_move(), 123, -45, 9, Bound::Exact, 0);
        let hit = tt.probe(hash, 0).expect("stored entry must probe");
        assert_eq!(hit.mv, test_move());
        assert_eq!(hit.value, 123);
        assert_eq!(hit.eval, -45);
        assert_eq!(hit.depth, 9);
        assert_eq!(hit.bound, Bound::Exact);
    }

    #[test]
    fn test_probe_misses_on_different_hash16() {
        let tt = TranspositionTable::new(1);
        let hash = 0x1111_0000_0000_0001;
        tt.store(hash, test_move(), 0, 0, 1, Bound::Lower, 0);

        // Same bucket, different upper bits
        let other = 0x2222_0000_0000_0001;
        assert!(tt.probe(other, 0).is_none());
    }

    #[test]
    fn test_negative_values_survive_packing() {
        let tt = TranspositionTable::new(1);
        tt.store(42, Move::NONE, -321, -1000, -2, Bound::Upper, 0);
        let hit = tt.probe(42, 0).unwrap();
        assert_eq!(hit.value, -321);
        assert_eq!(hit.eval, -1000);
        assert_eq!(hit.depth, -2);
    }

    #[test]
    fn test_mate_score_translation() {
        let mate_at_five = MATE - 5;
        // Stored at height 3, the value becomes root-independent
        assert_eq!(value_to_tt(mate_at_five, 3), mate_at_five + 3);
        assert_eq!(value_from_tt(value_to_tt(mate_at_five, 3), 3), mate_at_five);

        let mated_at_five = -(MATE - 5);
        assert_eq!(value_from_tt(value_to_tt(mated_at_five, 4), 4), mated_at_five);

        assert_eq!(value_to_tt(100, 7), 100);
    }

    #[test]
    fn test_clear_empties_table() {
        let tt = TranspositionTable::new(1);
        tt.store(7, test_move(), 10, 10, 5, Bound::Exact, 0);
        tt.clear();
        assert!(tt.probe(7, 0).is_none());
        assert_eq!(tt.hashfull(), 0);
    }

    #[test]
    fn test_hashfull_counts_current_generation() {
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.hashfull(), 0);
        for i in 0..512u64 {
            tt.store(i << 20 | i, test_move(), 0, 0, 1, Bound::Exact, 0);
        }
        assert!(tt.hashfull() > 0);
    }

    #[test]
    fn test_deep_recent_entries_survive() {
        let tt = TranspositionTable::new(1);
        let base = 0xABCD_0000_0000_0000u64;
        // Fill one bucket with shallow entries, then force a replacement
        for i in 0..4u64 {
            let hash = (base + (i << 48)) | 5;
            tt.store(hash, test_move(), 0, 0, if i == 0 { 20 } else { 2 }, Bound::Exact, 0);
        }
        // The deep first entry should still be probeable
        assert!(tt.probe(base | 5, 0).is_some());
    }
}
