use std::collections::VecDeque;

use crate::collections::FastMap;
use crate::WidgetId;

/// Released instances awaiting reuse, queued first-in first-out per
/// archetype.
#[derive(Debug, Default)]
pub(crate) struct InstancePool {
    queues: FastMap<WidgetId, VecDeque<WidgetId>>,
}

impl InstancePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, archetype: WidgetId, instance: WidgetId) {
        self.queues.entry(archetype).or_default().push_back(instance);
    }

    /// Pops the oldest instance for `archetype` that `usable` accepts,
    /// dropping stale entries on the way.
    pub fn dequeue(
        &mut self,
        archetype: WidgetId,
        mut usable: impl FnMut(WidgetId) -> bool,
    ) -> Option<WidgetId> {
        let queue = self.queues.get_mut(&archetype)?;
        while let Some(candidate) = queue.pop_front() {
            if usable(candidate) {
                return Some(candidate);
            }
            log::warn!("dropping stale pooled instance {candidate} of archetype {archetype}");
        }
        None
    }

    pub fn len_for(&self, archetype: WidgetId) -> usize {
        self.queues.get(&archetype).map_or(0, VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn contains(&self, archetype: WidgetId, instance: WidgetId) -> bool {
        self.queues
            .get(&archetype)
            .is_some_and(|queue| queue.contains(&instance))
    }
}
