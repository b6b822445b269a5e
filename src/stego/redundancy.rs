// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Repetition coding with hard majority voting.
//!
//! Copies are laid out sequentially: copy `j` of bit `i` sits at
//! `j * bit_count + i`. Reconciliation votes each bit across the copies and
//! reports how strongly the copies agreed.

/// Result of reconciling `r` copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Voted bits, `bit_count` long.
    pub bits: Vec<u8>,
    /// Mean over bit positions of (copies agreeing with the vote / copies).
    /// 1.0 when every copy is identical.
    pub agreement: f64,
    /// Bit positions where at least one copy disagreed with the vote.
    pub disputed: usize,
}

/// Lay out `copies` sequential copies of `bits`.
pub fn replicate(bits: &[u8], copies: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len() * copies);
    for _ in 0..copies {
        out.extend_from_slice(bits);
    }
    out
}

/// Majority-vote `copies` sequential copies of a `bit_count`-bit block.
///
/// Ties (even copy counts) resolve to the value of the first copy, so two
/// disagreeing copies never produce a bit neither of them holds.
/// Missing trailing positions (a short `stream`) simply do not vote.
pub fn reconcile(stream: &[u8], bit_count: usize, copies: usize) -> Reconciled {
    if bit_count == 0 || copies == 0 {
        return Reconciled { bits: Vec::new(), agreement: 1.0, disputed: 0 };
    }

    let mut bits = Vec::with_capacity(bit_count);
    let mut agreement_sum = 0.0f64;
    let mut disputed = 0usize;

    for i in 0..bit_count {
        let mut ones = 0usize;
        let mut present = 0usize;
        let mut first = None;
        for copy in 0..copies {
            if let Some(&b) = stream.get(copy * bit_count + i) {
                let b = b & 1;
                first.get_or_insert(b);
                ones += usize::from(b);
                present += 1;
            }
        }
        if present == 0 {
            bits.push(0);
            disputed += 1;
            continue;
        }
        let zeros = present - ones;
        let voted = match ones.cmp(&zeros) {
            core::cmp::Ordering::Greater => 1,
            core::cmp::Ordering::Less => 0,
            core::cmp::Ordering::Equal => first.unwrap_or(0),
        };
        let agreeing = if voted == 1 { ones } else { zeros };
        if agreeing != copies {
            disputed += 1;
        }
        agreement_sum += agreeing as f64 / copies as f64;
        bits.push(voted);
    }

    Reconciled { bits, agreement: agreement_sum / bit_count as f64, disputed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_copies_full_agreement() {
        let bits = vec![0, 1, 1, 0, 1, 0, 0, 1];
        let r = reconcile(&replicate(&bits, 5), bits.len(), 5);
        assert_eq!(r.bits, bits);
        assert_eq!(r.agreement, 1.0);
        assert_eq!(r.disputed, 0);
    }

    #[test]
    fn majority_corrects_minority_flips() {
        let bits = vec![0, 1, 0, 1];
        let mut stream = replicate(&bits, 5);
        // Flip bit 0 in two of five copies.
        stream[0] ^= 1;
        stream[4] ^= 1;
        let r = reconcile(&stream, 4, 5);
        assert_eq!(r.bits, bits);
        assert_eq!(r.disputed, 1);
        // Three positions at 1.0, one at 3/5.
        assert!((r.agreement - (3.0 + 0.6) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn single_copy_passthrough() {
        let bits = vec![1, 0, 1, 1, 0];
        let r = reconcile(&bits, 5, 1);
        assert_eq!(r.bits, bits);
        assert_eq!(r.agreement, 1.0);
    }

    #[test]
    fn tie_prefers_first_copy() {
        let r = reconcile(&[1, 0], 1, 2);
        assert_eq!(r.bits, vec![1]);
        assert_eq!(r.agreement, 0.5);
    }

    #[test]
    fn empty_input() {
        let r = reconcile(&[], 0, 3);
        assert!(r.bits.is_empty());
        assert_eq!(r.agreement, 1.0);
    }
}
