/// Version masks restricting the document versions a rule is active for.
///
/// A [`VersionMask`] is a closed set over the non-negative integers, stored
/// as a sorted list of disjoint inclusive ranges where an open upper end
/// means "unbounded above". Three primitives build every mask: explicit
/// enumeration, a single range, and complement. Masks combine by
/// intersection only; a rule starts with the full mask and every `version`,
/// `minimum_version`, or `maximum_version` declaration narrows it.
use std::ops::Not;

/// A set of non-negative version numbers, possibly unbounded above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMask {
    /// Sorted, disjoint, inclusive ranges. `None` as the upper end means the
    /// range extends to infinity.
    ranges: Vec<(u64, Option<u64>)>,
}

impl VersionMask {
    /// Returns the mask containing every version.
    pub fn all() -> Self {
        Self {
            ranges: vec![(0, None)],
        }
    }

    /// Returns the empty mask.
    pub fn none() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Builds a mask from an explicit list of versions.
    ///
    /// Duplicates are merged; adjacent versions collapse into ranges.
    pub fn from_versions(versions: &[u64]) -> Self {
        let mut sorted: Vec<u64> = versions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut ranges: Vec<(u64, Option<u64>)> = Vec::new();
        for version in sorted {
            match ranges.last_mut() {
                Some((_, Some(end))) if *end + 1 == version => *end = version,
                Some(_) | None => ranges.push((version, Some(version))),
            }
        }
        Self { ranges }
    }

    /// Builds a mask from a single inclusive range.
    ///
    /// `None` as the upper bound means unbounded above. An inverted range
    /// yields the empty mask.
    pub fn from_range(minimum: u64, maximum: Option<u64>) -> Self {
        if let Some(maximum) = maximum {
            if maximum < minimum {
                return Self::none();
            }
        }
        Self {
            ranges: vec![(minimum, maximum)],
        }
    }

    /// Returns `true` if no version is contained.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns `true` if every version is contained.
    pub fn is_all(&self) -> bool {
        self.ranges == [(0, None)]
    }

    /// Tests whether the given version is contained in this mask.
    ///
    /// Negative versions are never contained.
    pub fn matches(&self, version: i64) -> bool {
        let Ok(version) = u64::try_from(version) else {
            return false;
        };
        let index = self.ranges.partition_point(|(start, _)| *start <= version);
        if index == 0 {
            return false;
        }
        match self.ranges[index - 1].1 {
            Some(end) => version <= end,
            None => true,
        }
    }

    /// Returns the intersection of this mask with another.
    #[must_use]
    pub fn intersected(&self, other: &Self) -> Self {
        let mut ranges = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_start, a_end) = self.ranges[i];
            let (b_start, b_end) = other.ranges[j];
            let start = a_start.max(b_start);
            let end = match (a_end, b_end) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            };
            match end {
                Some(end) if start <= end => ranges.push((start, Some(end))),
                Some(_) => {}
                None => ranges.push((start, None)),
            }
            // Advance whichever range ends first; open ends never advance.
            match (a_end, b_end) {
                (Some(a), Some(b)) => {
                    if a <= b {
                        i += 1;
                    } else {
                        j += 1;
                    }
                }
                (Some(_), None) => i += 1,
                (None, Some(_)) => j += 1,
                (None, None) => break,
            }
        }
        Self { ranges }
    }
}

impl Not for VersionMask {
    type Output = Self;

    /// Complements this mask over the natural-number domain.
    fn not(self) -> Self {
        let mut ranges = Vec::new();
        let mut next = 0u64;
        for (start, end) in &self.ranges {
            if *start > next {
                ranges.push((next, Some(start - 1)));
            }
            match end {
                Some(end) => next = end + 1,
                None => return Self { ranges },
            }
        }
        ranges.push((next, None));
        Self { ranges }
    }
}
