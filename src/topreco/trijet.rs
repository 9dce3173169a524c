//! Trijet enumeration
//!
//! Produces every unordered triple of jets exactly once, in lexicographic
//! index order `(i < j < k)`. That order is the tie-break order used by the
//! selector, so it must never change.

use crate::error::ReconError;
use crate::jets::{Jet, JetPool};
use crate::kinematics::FourMomentum;
use crate::ReconResult;
use serde::{Deserialize, Serialize};

/// Three distinct jets forming a hadronic top hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trijet {
    /// Jets in ascending pool-index order
    pub jets: [Jet; 3],
    /// Position of the enumeration this triple came from
    pub ordinal: usize,
}

impl Trijet {
    pub fn new(a: Jet, b: Jet, c: Jet, ordinal: usize) -> Self {
        debug_assert!(a.index < b.index && b.index < c.index);
        Self {
            jets: [a, b, c],
            ordinal,
        }
    }

    /// Pool indices of the three jets
    pub fn indices(&self) -> [usize; 3] {
        [self.jets[0].index, self.jets[1].index, self.jets[2].index]
    }

    pub fn contains(&self, index: usize) -> bool {
        self.jets.iter().any(|j| j.index == index)
    }

    /// True when the two triples share at least one jet
    pub fn overlaps(&self, other: &Trijet) -> bool {
        self.jets.iter().any(|j| other.contains(j.index))
    }

    pub fn n_btagged(&self) -> usize {
        self.jets.iter().filter(|j| j.is_btagged).count()
    }

    pub fn has_btag(&self) -> bool {
        self.n_btagged() > 0
    }

    /// Positions (0..3) that may play the b-jet role
    ///
    /// Only tagged positions when the triple has a tag, otherwise all three.
    pub fn b_positions(&self) -> Vec<usize> {
        let tagged: Vec<usize> = (0..3).filter(|&p| self.jets[p].is_btagged).collect();
        if tagged.is_empty() {
            vec![0, 1, 2]
        } else {
            tagged
        }
    }

    /// Reject a b-jet position outside the triple
    pub fn check_b_position(&self, b_position: usize) -> ReconResult<()> {
        if b_position < 3 {
            Ok(())
        } else {
            Err(ReconError::Precondition(format!(
                "b-jet position {} outside trijet {:?}",
                b_position,
                self.indices()
            )))
        }
    }

    /// The two jets left after picking `b_position` as the b-jet,
    /// ordered by descending p_T
    ///
    /// `b_position` must be below 3.
    pub fn light_pair(&self, b_position: usize) -> [Jet; 2] {
        debug_assert!(b_position < 3, "b_position {} outside trijet", b_position);
        let mut light = [self.jets[0]; 2];
        let mut n = 0;
        for (p, jet) in self.jets.iter().enumerate() {
            if p != b_position {
                light[n] = *jet;
                n += 1;
            }
        }
        if light[1].pt() > light[0].pt() {
            light.swap(0, 1);
        }
        light
    }

    /// Sum of the three four-momenta
    pub fn momentum(&self) -> FourMomentum {
        self.jets.iter().map(|j| j.momentum).sum()
    }
}

/// Generates all C(M,3) triples of a jet pool
#[derive(Debug, Clone, Copy, Default)]
pub struct TrijetEnumerator;

impl TrijetEnumerator {
    pub fn new() -> Self {
        Self
    }

    /// Number of triples for `m` jets
    pub fn n_combinations(m: usize) -> usize {
        if m < 3 {
            0
        } else {
            m * (m - 1) * (m - 2) / 6
        }
    }

    /// All triples in lexicographic order; empty when fewer than 3 jets
    pub fn enumerate(&self, pool: &JetPool) -> Vec<Trijet> {
        let jets = pool.jets();
        let m = jets.len();
        let mut out = Vec::with_capacity(Self::n_combinations(m));
        for i in 0..m {
            for j in (i + 1)..m {
                for k in (j + 1)..m {
                    out.push(Trijet::new(jets[i], jets[j], jets[k], out.len()));
                }
            }
        }
        out
    }
}
