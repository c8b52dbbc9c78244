//! Bounded best-N retention of scored runs.

use sw_results::BestEntry;

/// The `capacity` lowest-fitness runs seen so far, best first.
///
/// Once full, a candidate is admitted only if strictly better than the
/// current worst entry, which it evicts. NaN fitness is never admitted.
/// `None` capacity keeps every scored run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestSet {
    capacity: Option<usize>,
    entries: Vec<BestEntry>,
}

impl BestSet {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Offer a scored run; returns whether it was retained.
    pub fn offer(&mut self, index: usize, fitness: f64) -> bool {
        if fitness.is_nan() {
            return false;
        }
        let full = self.capacity.is_some_and(|cap| self.entries.len() >= cap);
        if full {
            match self.entries.last() {
                Some(worst) if fitness < worst.fitness => {
                    self.entries.pop();
                }
                _ => return false,
            }
        }
        let at = self.entries.partition_point(|entry| entry.fitness <= fitness);
        self.entries.insert(at, BestEntry { index, fitness });
        true
    }

    pub fn entries(&self) -> &[BestEntry] {
        &self.entries
    }

    pub fn worst(&self) -> Option<&BestEntry> {
        self.entries.last()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|entry| entry.index).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<BestEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitnesses(set: &BestSet) -> Vec<f64> {
        set.entries().iter().map(|e| e.fitness).collect()
    }

    #[test]
    fn keeps_three_smallest() {
        let mut best = BestSet::new(Some(3));
        for (index, fitness) in [5.0, 3.0, 8.0, 1.0, 9.0].into_iter().enumerate() {
            best.offer(index, fitness);
        }
        assert_eq!(fitnesses(&best), vec![1.0, 3.0, 5.0]);
        assert_eq!(best.indices(), vec![3, 1, 0]);
        assert_eq!(best.worst().map(|e| e.fitness), Some(5.0));
    }

    #[test]
    fn ties_with_worst_are_rejected_when_full() {
        let mut best = BestSet::new(Some(2));
        assert!(best.offer(0, 1.0));
        assert!(best.offer(1, 2.0));
        assert!(!best.offer(2, 2.0));
        assert!(best.offer(3, 1.0));
        assert_eq!(best.indices(), vec![0, 3]);
    }

    #[test]
    fn nan_is_never_retained() {
        let mut best = BestSet::new(None);
        assert!(!best.offer(0, f64::NAN));
        assert!(best.is_empty());
    }

    #[test]
    fn unbounded_keeps_everything_sorted() {
        let mut best = BestSet::new(None);
        for (index, fitness) in [2.0, -1.0, 7.0].into_iter().enumerate() {
            assert!(best.offer(index, fitness));
        }
        assert_eq!(fitnesses(&best), vec![-1.0, 2.0, 7.0]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn retains_the_smallest(values in prop::collection::vec(-1e6f64..1e6, 0..60), cap in 1usize..10) {
                let mut best = BestSet::new(Some(cap));
                for (index, value) in values.iter().enumerate() {
                    best.offer(index, *value);
                }
                let mut sorted = values.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                sorted.truncate(cap);
                prop_assert_eq!(fitnesses(&best), sorted);
                prop_assert!(best.len() <= cap);
            }
        }
    }
}
