/// Fixed-capacity circular buffer of `N` slots. Slots are allocated once
/// and recycled, so a `RingBuffer<Vec<_>, 2>` works as an in-place
/// double buffer that keeps both allocations alive.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    slots: [T; N],
    /// Index of the newest slot.
    head: usize,
    len: usize,
}

impl<T: Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        assert!(N > 0, "ring buffer needs at least one slot");
        Self {
            slots: std::array::from_fn(|_| T::default()),
            head: 0,
            len: 0,
        }
    }
}

impl<T, const N: usize> RingBuffer<T, N> {
    /// Rotate to the oldest slot and return it as the new head. The slot
    /// still holds its old contents; callers clear or overwrite it.
    pub fn advance(&mut self) -> &mut T {
        self.head = (self.head + 1) % N;
        if self.len < N {
            self.len += 1;
        }
        &mut self.slots[self.head]
    }

    pub fn push(&mut self, value: T) {
        *self.advance() = value;
    }

    pub fn current(&self) -> &T {
        &self.slots[self.head]
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.slots[self.head]
    }

    /// `age` 0 is the newest slot, 1 the one before it, and so on.
    pub fn back(&self, age: usize) -> &T {
        &self.slots[(self.head + N - age % N) % N]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate written slots from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let len = self.len;
        let oldest = (self.head + N + 1 - len) % N;
        (0..len).map(move |i| &self.slots[(oldest + i) % N])
    }
}
