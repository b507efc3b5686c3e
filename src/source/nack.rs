use std::collections::HashMap;
use std::sync::Mutex;

use crate::rtp::rtcp::{Nack, NackEntry, RtcpBuf};
use crate::rtp::{seq_distance, Ssrc};
use crate::util::lock;

/// Missing sequence numbers waiting to be requested.
///
/// The map has its own lock. Packet arrival registers and resolves gaps while a
/// timer driven caller serializes them into NACK feedback.
#[derive(Debug)]
pub(crate) struct NackTracker {
    retention: u16,
    max_fci: usize,
    map: Mutex<NackMap>,
}

#[derive(Debug, Default)]
struct NackMap {
    entries: HashMap<u16, NackState>,
    /// Newest head seen in a registration.
    head: Option<u16>,
    fci_sent: u64,
    stale_pruned: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NackState {
    /// Bit `i` set means `seq + i + 1` is missing too.
    mask: u16,
    /// Highest sequence number when the gap was detected.
    head: u16,
    needs_send: bool,
}

impl NackTracker {
    pub fn new(retention: u16, max_fci: usize) -> Self {
        NackTracker {
            retention,
            max_fci,
            map: Mutex::new(NackMap::default()),
        }
    }

    /// Register one missing sequence number.
    ///
    /// An existing entry is only replaced when mask or head differ.
    pub fn register(&self, seq: u16, mask: u16, head: u16) {
        let mut map = lock(&self.map);
        map.register(seq, mask, head);
        map.prune(self.retention);
    }

    /// Register all sequence numbers in the gap ending right before `head`.
    pub fn register_gap(&self, head: u16, missing: u64) {
        if missing == 0 {
            return;
        }

        // Anything further back is stale as soon as it is registered.
        let count = missing.min(self.retention as u64 + 1).min(0x7fff) as u16;
        let first = head.wrapping_sub(count);

        trace!("Register NACK gap {}-{} head {}", first, head.wrapping_sub(1), head);

        let mut map = lock(&self.map);

        for i in 0..count {
            let seq = first.wrapping_add(i);
            // How many more follow in the same gap, max 16.
            let following = (count - i - 1).min(16);
            let mask = if following == 0 {
                0
            } else {
                (((1_u32 << following) - 1) & 0xffff) as u16
            };
            map.register(seq, mask, head);
        }

        map.prune(self.retention);
    }

    /// A packet arrived. Resolves its pending entry, if any.
    ///
    /// Returns true if the sequence number was pending.
    pub fn resolve(&self, seq: u16) -> bool {
        let mut map = lock(&self.map);

        let was_pending = map.entries.remove(&seq).is_some();

        // Clear the bit of this seq in earlier masks.
        for offset in 1..=16_u16 {
            let pid = seq.wrapping_sub(offset);
            if let Some(entry) = map.entries.get_mut(&pid) {
                entry.mask &= !(1 << (offset - 1));
            }
        }

        if was_pending {
            trace!("Resolved NACK {}", seq);
        }

        was_pending
    }

    /// Drop the `count` oldest entries.
    pub fn abandon(&self, count: usize) -> usize {
        let mut map = lock(&self.map);

        let oldest: Vec<u16> = map.oldest_first().into_iter().take(count).collect();
        for seq in &oldest {
            map.entries.remove(seq);
        }

        if !oldest.is_empty() {
            debug!("Abandoned {} NACK entries", oldest.len());
        }

        oldest.len()
    }

    /// Write pending entries as a Generic NACK.
    ///
    /// Returns the number of FCI written, or None if nothing was pending
    /// (or the buffer has no room).
    pub fn add_nack(&self, sender_ssrc: Ssrc, ssrc: Ssrc, buf: &mut RtcpBuf) -> Option<usize> {
        let mut map = lock(&self.map);

        let pending: Vec<u16> = map
            .oldest_first()
            .into_iter()
            .filter(|s| map.entries.get(s).map(|e| e.needs_send).unwrap_or(false))
            .collect();

        if pending.is_empty() {
            return None;
        }

        // header + sender SSRC + media SSRC, then one word per FCI.
        let room = buf.remaining().saturating_sub(12) / 4;
        let max_fci = self.max_fci.min(room);

        if max_fci == 0 {
            warn!("No room for NACK in RTCP buffer: {}", buf.remaining());
            return None;
        }

        let mut reports = Vec::new();

        for seq in pending {
            if reports.len() == max_fci {
                break;
            }

            let Some(entry) = map.entries.get_mut(&seq) else {
                continue;
            };

            // Covered by an earlier mask in this round.
            if !entry.needs_send {
                continue;
            }

            entry.needs_send = false;
            let nack = NackEntry {
                pid: seq,
                blp: entry.mask,
            };

            for offset in 1..=16_u16 {
                if nack.blp & (1 << (offset - 1)) > 0 {
                    if let Some(e) = map.entries.get_mut(&seq.wrapping_add(offset)) {
                        e.needs_send = false;
                    }
                }
            }

            reports.push(nack);
        }

        let count = reports.len();

        let nack = Nack {
            sender_ssrc,
            ssrc,
            reports,
        };

        trace!("Write NACK for {}: {:?}", ssrc, nack.reports);

        buf.append(&nack)?;
        map.fci_sent += count as u64;

        Some(count)
    }

    /// Sorted sequence numbers currently in the map, oldest first.
    pub fn pending(&self) -> Vec<u16> {
        lock(&self.map).oldest_first()
    }

    /// (FCI sent, stale entries pruned)
    pub fn counters(&self) -> (u64, u64) {
        let map = lock(&self.map);
        (map.fci_sent, map.stale_pruned)
    }
}

impl NackMap {
    fn register(&mut self, seq: u16, mask: u16, head: u16) {
        let state = NackState {
            mask,
            head,
            needs_send: true,
        };

        match self.entries.get(&seq) {
            Some(e) if e.mask == mask && e.head == head => {}
            _ => {
                self.entries.insert(seq, state);
            }
        }

        let newer = self
            .head
            .map(|h| seq_distance(head, h) > 0)
            .unwrap_or(true);

        if newer {
            self.head = Some(head);
        }
    }

    fn prune(&mut self, retention: u16) {
        let Some(head) = self.head else {
            return;
        };

        let before = self.entries.len();

        self.entries
            .retain(|_, e| (seq_distance(head, e.head) as i32) <= retention as i32);

        let pruned = before - self.entries.len();

        if pruned > 0 {
            debug!("Pruned {} stale NACK entries", pruned);
            self.stale_pruned += pruned as u64;
        }
    }

    fn oldest_first(&self) -> Vec<u16> {
        let Some(head) = self.head else {
            return vec![];
        };

        let mut seqs: Vec<u16> = self.entries.keys().copied().collect();
        // Largest distance behind the head first.
        seqs.sort_by_key(|s| std::cmp::Reverse(seq_distance(head, *s)));
        seqs
    }
}
