/// Ordered set of disjoint half-open intervals [start, stop) over a single
/// chromosome, always kept in canonical merged form: consecutive stored
/// ranges satisfy prev.1 < next.0, so no two ranges overlap or touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    ranges: Vec<(u64, u64)>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Build a canonical set from arbitrary ranges.  Empty ranges
    /// (start >= stop) are dropped; overlapping or adjacent ranges are
    /// coalesced.
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let mut v: Vec<_> = ranges.into_iter().filter(|(a, b)| a < b).collect();
        v.sort_unstable_by_key(|(a, _)| *a);
        let mut out = Vec::with_capacity(v.len());
        for r in v {
            push_coalesced(&mut out, r);
        }
        Self { ranges: out }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(u64, u64)] {
        &self.ranges
    }

    /// Total base pairs covered.  Never double-counted since the set is
    /// canonical.
    pub fn coverage(&self) -> u64 {
        self.ranges.iter().map(|(a, b)| b - a).sum()
    }

    /// Points covered by self or other
    pub fn union(&self, other: &Self) -> Self {
        let (a, b) = (&self.ranges, &other.ranges);
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::with_capacity(a.len() + b.len());
        while i < a.len() || j < b.len() {
            let take_a = j >= b.len() || (i < a.len() && a[i].0 <= b[j].0);
            let r = if take_a {
                i += 1;
                a[i - 1]
            } else {
                j += 1;
                b[j - 1]
            };
            push_coalesced(&mut out, r);
        }
        Self { ranges: out }
    }

    /// Points covered by both self and other
    pub fn intersect(&self, other: &Self) -> Self {
        let (a, b) = (&self.ranges, &other.ranges);
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < a.len() && j < b.len() {
            let start = a[i].0.max(b[j].0);
            let stop = a[i].1.min(b[j].1);
            if start < stop {
                out.push((start, stop));
            }
            if a[i].1 <= b[j].1 {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges: out }
    }
}

fn push_coalesced(v: &mut Vec<(u64, u64)>, (start, stop): (u64, u64)) {
    if let Some(last) = v.last_mut() {
        // adjacent ranges merge along with overlapping ones
        if start <= last.1 {
            last.1 = last.1.max(stop);
            return;
        }
    }
    v.push((start, stop));
}
