use heapless::Vec;

/// Number of servos the tick interrupt services unless configured otherwise.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 4;

/// Index of a servo slot in a [`ServoBank`](crate::ServoBank).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoId(u8);

impl ServoId {
    pub(crate) const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Slot index.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Ordered, fixed-capacity list of servos serviced by the tick interrupt.
///
/// Entries keep insertion order. Removing one shifts the rest left.
#[derive(Clone, Debug)]
pub(crate) struct Registry<const CAPACITY: usize> {
    entries: Vec<ServoId, CAPACITY>,
}

impl<const CAPACITY: usize> Registry<CAPACITY> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn as_slice(&self) -> &[ServoId] {
        &self.entries
    }

    pub(crate) fn contains(&self, id: ServoId) -> bool {
        self.entries.contains(&id)
    }

    pub(crate) fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Append `id`. Returns `false`, leaving the list alone, when full.
    pub(crate) fn push(&mut self, id: ServoId) -> bool {
        self.entries.push(id).is_ok()
    }

    /// Remove the first entry matching `matches`, keeping the others in order.
    pub(crate) fn remove_first(&mut self, mut matches: impl FnMut(ServoId) -> bool) -> Option<ServoId> {
        let position = self.entries.iter().position(|&id| matches(id))?;
        let removed = self.entries.get(position).copied()?;
        if let Some(tail) = self.entries.get_mut(position..) {
            tail.rotate_left(1);
        }
        self.entries.pop();
        Some(removed)
    }
}
