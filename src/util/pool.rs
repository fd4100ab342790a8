/// Slot arena with index reuse. An index stays valid until it is freed;
/// freed slots are handed out again before the arena grows.
#[derive(Debug)]
pub struct Pool<T> {
    items: Vec<Option<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Pool<T> {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            items: Vec::with_capacity(cap),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn alloc(&mut self, item: T) -> usize {
        self.len += 1;
        match self.free.pop() {
            Some(idx) => {
                self.items[idx] = Some(item);
                idx
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        }
    }

    pub fn free(&mut self, idx: usize) -> Option<T> {
        let item = self.items.get_mut(idx)?.take()?;
        self.free.push(idx);
        self.len -= 1;
        Some(item)
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)?.as_ref()
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.items.get_mut(idx)?.as_mut()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_ref().map(|t| (i, t)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(|(i, item)| item.as_mut().map(|t| (i, t)))
    }
}
