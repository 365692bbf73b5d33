//! Fair sharing of resource throughput among concurrent activities.
//!
//! Each of `n` running activities progresses at `throughput(n) / n`. The model recalculates the remaining volume of
//! all activities whenever an activity is added or completed, so the completion times always reflect the current
//! number of activities.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use sugars::boxed;

/// Function describing the dependence of resource throughput on the number of concurrent activities.
pub type ThroughputFn = Box<dyn Fn(usize) -> f64>;

struct Activity<T> {
    remaining_volume: f64,
    id: u64,
    item: T,
}

impl<T> PartialOrd for Activity<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Activity<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .remaining_volume
            .total_cmp(&self.remaining_volume)
            .then(other.id.cmp(&self.id))
    }
}

impl<T> PartialEq for Activity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.remaining_volume == other.remaining_volume && self.id == other.id
    }
}

impl<T> Eq for Activity<T> {}

/// Fair throughput sharing model.
///
/// Activities with equal remaining volume complete in the order of their insertion.
pub struct FairSharingModel<T> {
    throughput_fn: ThroughputFn,
    entries: BinaryHeap<Activity<T>>,
    next_id: u64,
    last_throughput_per_item: f64,
    last_recalculation_time: f64,
}

impl<T> FairSharingModel<T> {
    /// Creates model with fixed total throughput.
    pub fn with_fixed_throughput(throughput: f64) -> Self {
        Self::with_dynamic_throughput(boxed!(move |_| throughput))
    }

    /// Creates model with total throughput depending on the number of activities.
    pub fn with_dynamic_throughput(throughput_fn: ThroughputFn) -> Self {
        Self {
            throughput_fn,
            entries: BinaryHeap::new(),
            next_id: 0,
            last_throughput_per_item: 0.,
            last_recalculation_time: 0.,
        }
    }

    fn recalculate(&mut self, current_time: f64, throughput_per_item: f64) {
        let processed_volume = (current_time - self.last_recalculation_time) * self.last_throughput_per_item;
        self.entries = std::mem::take(&mut self.entries)
            .into_iter()
            .map(|mut entry| {
                entry.remaining_volume -= processed_volume;
                entry
            })
            .collect();
        self.last_throughput_per_item = throughput_per_item;
        self.last_recalculation_time = current_time;
    }

    fn throughput_per_item(&self, count: usize) -> f64 {
        (self.throughput_fn)(count) / count as f64
    }

    /// Adds new activity with the given volume started at `current_time`.
    pub fn insert(&mut self, current_time: f64, volume: f64, item: T) {
        let new_count = self.entries.len() + 1;
        self.recalculate(current_time, self.throughput_per_item(new_count));
        self.entries.push(Activity {
            remaining_volume: volume,
            id: self.next_id,
            item,
        });
        self.next_id += 1;
    }

    /// Removes the activity which completes first and returns it along with its completion time.
    pub fn pop(&mut self) -> Option<(f64, T)> {
        let entry = self.entries.pop()?;
        let complete_time = self.last_recalculation_time + entry.remaining_volume / self.last_throughput_per_item;
        if self.entries.is_empty() {
            self.last_recalculation_time = complete_time;
            self.last_throughput_per_item = 0.;
        } else {
            let count = self.entries.len();
            self.recalculate(complete_time, self.throughput_per_item(count));
        }
        Some((complete_time, entry.item))
    }

    /// Returns the activity which completes first along with its completion time without removing it.
    pub fn peek(&self) -> Option<(f64, &T)> {
        self.entries.peek().map(|entry| {
            (
                self.last_recalculation_time + entry.remaining_volume / self.last_throughput_per_item,
                &entry.item,
            )
        })
    }

    /// Returns the number of running activities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no running activities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn single_activity() {
        let mut model = FairSharingModel::with_fixed_throughput(100.);
        model.insert(0., 200., 1);
        assert_eq!(model.peek(), Some((2., &1)));
        assert_eq!(model.pop(), Some((2., 1)));
        assert_eq!(model.pop(), None);
    }

    #[test]
    fn equal_activities_share_throughput() {
        let mut model = FairSharingModel::with_fixed_throughput(10.);
        model.insert(0., 10., "a");
        model.insert(0., 10., "b");
        assert_eq!(model.pop(), Some((2., "a")));
        assert_eq!(model.pop(), Some((2., "b")));
    }

    #[test]
    fn late_arrival_slows_down_running_activity() {
        let mut model = FairSharingModel::with_fixed_throughput(10.);
        model.insert(0., 20., 1);
        // 10 units are left when the second activity arrives
        model.insert(1., 5., 2);
        let (time, item) = model.pop().unwrap();
        assert_eq!(item, 2);
        assert_abs_diff_eq!(time, 2., epsilon = 1e-12);
        let (time, item) = model.pop().unwrap();
        assert_eq!(item, 1);
        // 5 units at full speed after the second activity completes
        assert_abs_diff_eq!(time, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn zero_volume_completes_immediately() {
        let mut model = FairSharingModel::with_fixed_throughput(10.);
        model.insert(3., 0., ());
        assert_eq!(model.pop(), Some((3., ())));
    }

    #[test]
    fn dynamic_throughput() {
        // total throughput degrades with the number of activities
        let mut model = FairSharingModel::with_dynamic_throughput(boxed!(|n: usize| 12. / n as f64));
        model.insert(0., 3., 1);
        model.insert(0., 3., 2);
        assert_eq!(model.len(), 2);
        let (time, _) = model.pop().unwrap();
        assert_abs_diff_eq!(time, 1., epsilon = 1e-12);
        let (time, _) = model.pop().unwrap();
        assert_abs_diff_eq!(time, 1., epsilon = 1e-12);
        assert!(model.is_empty());
    }
}
