//! Multi-fragment reassembly
//!
//! A message whose armored payload does not fit one sentence is split
//! into up to 9 fragments sharing a sequential group id. Fragments of one
//! group may arrive out of order and interleaved with other groups; they
//! are collected in a slot table keyed by (channel, group id) and joined
//! the instant the last slot fills.
//!
//! The table is bounded two ways: a partial group older than the timeout
//! is dropped, and when the entry cap is hit the oldest pending group is
//! evicted.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};

use ais_types::Channel;
use parking_lot::Mutex;

use crate::{
    DecoderConfig,
    sentence::Sentence,
};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReassemblyError {
    #[error("multi-fragment sentence without a group id")]
    MissingGroupId,
    #[error("fragment {fragment_number} of {fragment_count} carries {fill_bits} fill bits")]
    FillBitsBeforeTerminal {
        fragment_number: u8,
        fragment_count: u8,
        fill_bits: u8,
    },
    #[error("potential deadlock: reassembly table not available within {timeout:?}")]
    LockTimeout { timeout: Duration },
}

type GroupKey = (Option<Channel>, String);

#[derive(Clone, Debug)]
struct Fragment {
    payload: String,
    fill_bits: u8,
}

#[derive(Debug)]
struct PendingGroup {
    slots: Vec<Option<Fragment>>,
    created: Instant,
}

impl PendingGroup {
    fn new(fragment_count: u8, now: Instant) -> Self {
        Self {
            slots: vec![None; usize::from(fragment_count)],
            created: now,
        }
    }
}

/// Fragment slot table.
///
/// `push` passes single-fragment sentences through untouched and returns
/// a joined sentence (fragment numbering reset to 1/1, fill bits taken
/// from the terminal fragment) once a group completes.
#[derive(Debug)]
pub struct Reassembler {
    pending: HashMap<GroupKey, PendingGroup>,
    timeout: Duration,
    max_pending: usize,
}

impl Reassembler {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            pending: HashMap::new(),
            timeout: config.reassembly_timeout,
            max_pending: config.max_pending_groups,
        }
    }

    pub fn pending_groups(&self) -> usize {
        self.pending.len()
    }

    pub fn push(&mut self, sentence: Sentence) -> Result<Option<Sentence>, ReassemblyError> {
        self.push_at(sentence, Instant::now())
    }

    pub fn push_at(
        &mut self,
        sentence: Sentence,
        now: Instant,
    ) -> Result<Option<Sentence>, ReassemblyError> {
        if !sentence.is_multi_fragment() {
            return Ok(Some(sentence));
        }

        let Some(message_id) = sentence.message_id.clone() else {
            return Err(ReassemblyError::MissingGroupId);
        };
        if !sentence.is_terminal_fragment() && sentence.fill_bits != 0 {
            return Err(ReassemblyError::FillBitsBeforeTerminal {
                fragment_number: sentence.fragment_number,
                fragment_count: sentence.fragment_count,
                fill_bits: sentence.fill_bits,
            });
        }

        let key = (sentence.channel, message_id);
        if !self.pending.contains_key(&key) && self.pending.len() >= self.max_pending {
            self.evict_oldest();
        }

        let group = self
            .pending
            .entry(key.clone())
            .or_insert_with(|| PendingGroup::new(sentence.fragment_count, now));
        if group.slots.len() != usize::from(sentence.fragment_count) {
            // the group id was reused with a different fragment count;
            // the stale partial can never complete
            *group = PendingGroup::new(sentence.fragment_count, now);
        }

        let slot = usize::from(sentence.fragment_number) - 1;
        group.slots[slot] = Some(Fragment {
            payload: sentence.payload.clone(),
            fill_bits: sentence.fill_bits,
        });

        if group.slots.iter().any(|slot| slot.is_none()) {
            return Ok(None);
        }

        let Some(group) = self.pending.remove(&key) else {
            return Ok(None);
        };
        let mut payload = String::new();
        let mut fill_bits = 0;
        for fragment in group.slots.into_iter().flatten() {
            payload.push_str(&fragment.payload);
            fill_bits = fragment.fill_bits;
        }

        Ok(Some(Sentence {
            tag: sentence.tag,
            fragment_count: 1,
            fragment_number: 1,
            message_id: sentence.message_id,
            channel: sentence.channel,
            payload,
            fill_bits,
        }))
    }

    /// Drops pending groups older than the timeout; returns how many were
    /// dropped.
    pub fn expire(&mut self) -> usize {
        self.expire_at(Instant::now())
    }

    pub fn expire_at(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        let timeout = self.timeout;
        self.pending
            .retain(|_, group| now.duration_since(group.created) < timeout);
        before - self.pending.len()
    }

    /// Discards all pending partial groups, e.g. when the feed is torn
    /// down.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .pending
            .iter()
            .min_by_key(|(_, group)| group.created)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            tracing::warn!(
                group_id = %key.1,
                "reassembly table full, evicting oldest pending group"
            );
            self.pending.remove(&key);
        }
    }
}

/// A reassembly table shared between feeds.
///
/// All contents sit behind one mutex; the critical sections are the
/// insert/lookup/join of a single sentence. Acquisition is bounded: a
/// feed that cannot take the lock within the configured timeout gets a
/// [`ReassemblyError::LockTimeout`] diagnostic back instead of blocking
/// forever.
#[derive(Clone, Debug)]
pub struct SharedReassembler {
    inner: Arc<Mutex<Reassembler>>,
    lock_timeout: Duration,
}

impl SharedReassembler {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Reassembler::new(config))),
            lock_timeout: config.lock_timeout,
        }
    }

    fn lock(&self) -> Result<parking_lot::MutexGuard<'_, Reassembler>, ReassemblyError> {
        self.inner
            .try_lock_for(self.lock_timeout)
            .ok_or(ReassemblyError::LockTimeout {
                timeout: self.lock_timeout,
            })
    }

    pub fn push(&self, sentence: Sentence) -> Result<Option<Sentence>, ReassemblyError> {
        self.lock()?.push(sentence)
    }

    pub fn expire(&self) -> Result<usize, ReassemblyError> {
        Ok(self.lock()?.expire())
    }

    pub fn clear(&self) -> Result<(), ReassemblyError> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{
        Duration,
        Instant,
    };

    use ais_types::Channel;

    use crate::{
        DecoderConfig,
        reassembly::{
            Reassembler,
            ReassemblyError,
        },
        sentence::{
            Sentence,
            Tag,
        },
    };

    fn fragment(
        number: u8,
        count: u8,
        message_id: Option<&str>,
        payload: &str,
        fill_bits: u8,
    ) -> Sentence {
        Sentence {
            tag: Tag::Aivdm,
            fragment_count: count,
            fragment_number: number,
            message_id: message_id.map(str::to_owned),
            channel: Some(Channel::A),
            payload: payload.to_owned(),
            fill_bits,
        }
    }

    fn reassembler() -> Reassembler {
        Reassembler::new(&DecoderConfig::default())
    }

    #[test]
    fn it_passes_single_fragments_through_unchanged() {
        let mut reassembler = reassembler();
        let sentence = fragment(1, 1, None, "13u?etPv", 0);
        let out = reassembler.push(sentence.clone()).unwrap();
        assert_eq!(out, Some(sentence));
        assert_eq!(reassembler.pending_groups(), 0);
    }

    #[test]
    fn it_joins_fragments_in_order() {
        let mut reassembler = reassembler();
        assert_eq!(
            reassembler.push(fragment(1, 2, Some("3"), "AAAA", 0)).unwrap(),
            None
        );
        let joined = reassembler
            .push(fragment(2, 2, Some("3"), "BB", 2))
            .unwrap()
            .unwrap();
        assert_eq!(joined.payload, "AAAABB");
        assert_eq!(joined.fill_bits, 2);
        assert_eq!(joined.fragment_count, 1);
        assert_eq!(joined.fragment_number, 1);
        assert_eq!(joined.message_id.as_deref(), Some("3"));
        assert_eq!(reassembler.pending_groups(), 0);
    }

    #[test]
    fn it_joins_any_arrival_permutation_identically() {
        let fragments = [
            fragment(1, 3, Some("7"), "AA", 0),
            fragment(2, 3, Some("7"), "BB", 0),
            fragment(3, 3, Some("7"), "CC", 4),
        ];
        let permutations: &[[usize; 3]] =
            &[[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in permutations {
            let mut reassembler = reassembler();
            let mut joined = None;
            for &index in order {
                joined = reassembler.push(fragments[index].clone()).unwrap();
            }
            let joined = joined.expect("group did not complete");
            assert_eq!(joined.payload, "AABBCC", "order {order:?}");
            assert_eq!(joined.fill_bits, 4);
        }
    }

    #[test]
    fn it_lets_duplicates_overwrite() {
        let mut reassembler = reassembler();
        reassembler.push(fragment(1, 2, Some("5"), "OLD1", 0)).unwrap();
        reassembler.push(fragment(1, 2, Some("5"), "NEW1", 0)).unwrap();
        let joined = reassembler
            .push(fragment(2, 2, Some("5"), "TAIL", 0))
            .unwrap()
            .unwrap();
        assert_eq!(joined.payload, "NEW1TAIL");
    }

    #[test]
    fn it_keeps_groups_on_different_channels_apart() {
        let mut reassembler = reassembler();
        let mut on_b = fragment(1, 2, Some("1"), "BBBB", 0);
        on_b.channel = Some(Channel::B);
        reassembler.push(fragment(1, 2, Some("1"), "AAAA", 0)).unwrap();
        reassembler.push(on_b).unwrap();
        assert_eq!(reassembler.pending_groups(), 2);

        let joined = reassembler
            .push(fragment(2, 2, Some("1"), "TAIL", 0))
            .unwrap()
            .unwrap();
        assert_eq!(joined.payload, "AAAATAIL");
        assert_eq!(reassembler.pending_groups(), 1);
    }

    #[test]
    fn it_rejects_multi_fragment_sentences_without_group_ids() {
        let mut reassembler = reassembler();
        assert_eq!(
            reassembler.push(fragment(1, 2, None, "AAAA", 0)),
            Err(ReassemblyError::MissingGroupId)
        );
    }

    #[test]
    fn it_rejects_fill_bits_before_the_terminal_fragment() {
        let mut reassembler = reassembler();
        assert!(matches!(
            reassembler.push(fragment(1, 2, Some("2"), "AAAA", 3)),
            Err(ReassemblyError::FillBitsBeforeTerminal {
                fragment_number: 1,
                fragment_count: 2,
                fill_bits: 3,
            })
        ));
    }

    #[test]
    fn it_expires_stale_groups() {
        let mut reassembler = reassembler();
        let start = Instant::now();
        reassembler
            .push_at(fragment(1, 2, Some("9"), "AAAA", 0), start)
            .unwrap();
        assert_eq!(reassembler.expire_at(start + Duration::from_secs(59)), 0);
        assert_eq!(reassembler.expire_at(start + Duration::from_secs(61)), 1);
        assert_eq!(reassembler.pending_groups(), 0);

        // the late terminal fragment now opens a fresh group
        assert_eq!(
            reassembler
                .push_at(fragment(2, 2, Some("9"), "BB", 2), start + Duration::from_secs(61))
                .unwrap(),
            None
        );
    }

    #[test]
    fn it_restarts_a_group_whose_fragment_count_changed() {
        let mut reassembler = reassembler();
        reassembler.push(fragment(1, 3, Some("4"), "AAAA", 0)).unwrap();
        reassembler.push(fragment(1, 2, Some("4"), "XXXX", 0)).unwrap();
        let joined = reassembler
            .push(fragment(2, 2, Some("4"), "TAIL", 0))
            .unwrap()
            .unwrap();
        assert_eq!(joined.payload, "XXXXTAIL");
    }

    #[test]
    fn it_evicts_the_oldest_group_when_full() {
        let config = DecoderConfig {
            max_pending_groups: 2,
            ..Default::default()
        };
        let mut reassembler = Reassembler::new(&config);
        let start = Instant::now();
        reassembler
            .push_at(fragment(1, 2, Some("1"), "OLDEST", 0), start)
            .unwrap();
        reassembler
            .push_at(
                fragment(1, 2, Some("2"), "NEWER", 0),
                start + Duration::from_secs(1),
            )
            .unwrap();
        reassembler
            .push_at(
                fragment(1, 2, Some("3"), "NEWEST", 0),
                start + Duration::from_secs(2),
            )
            .unwrap();

        assert_eq!(reassembler.pending_groups(), 2);
        // group "1" is gone; its terminal fragment starts over
        assert_eq!(
            reassembler
                .push_at(fragment(2, 2, Some("1"), "TAIL", 0), start + Duration::from_secs(3))
                .unwrap(),
            None
        );
    }

    #[test]
    fn it_clears_pending_groups_on_cancellation() {
        let mut reassembler = reassembler();
        reassembler.push(fragment(1, 2, Some("1"), "AAAA", 0)).unwrap();
        reassembler.push(fragment(1, 2, Some("2"), "BBBB", 0)).unwrap();
        reassembler.clear();
        assert_eq!(reassembler.pending_groups(), 0);
    }
}
