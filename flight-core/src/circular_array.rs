/// Largest window the ring can hold, `head` is a `u8`.
pub const MAX_CIRCULAR_ARRAY_CAPACITY: usize = 255;

/// Fixed-capacity ring buffer with an order-statistic median.
///
/// `N` is the backing storage, `max_size` the runtime capacity (`1..=N`).
/// `head` always points at the most recently pushed element. Once full, every
/// push overwrites the oldest element.
#[derive(Debug, Clone)]
pub struct CircularArray<T, const N: usize = MAX_CIRCULAR_ARRAY_CAPACITY> {
    array: [T; N],
    max_size: u8,
    head: u8,
    push_count: u32,
}

impl<T, const N: usize> CircularArray<T, N>
where
    T: Copy + Default + PartialOrd,
{
    pub fn new(max_size: usize) -> Self {
        let upper = N.min(MAX_CIRCULAR_ARRAY_CAPACITY).max(1);
        Self {
            array: [T::default(); N],
            max_size: max_size.clamp(1, upper) as u8,
            head: 0,
            push_count: 0,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.push_count > 0 {
            self.head = ((self.head as usize + 1) % self.max_size as usize) as u8;
        }
        self.array[self.head as usize] = value;
        self.push_count = self.push_count.saturating_add(1);
    }

    /// Removes and returns the most recent element.
    pub fn pop(&mut self) -> Option<T> {
        if self.push_count == 0 {
            return None;
        }
        let value = self.array[self.head as usize];
        self.array[self.head as usize] = T::default();

        self.push_count = self.push_count.min(self.max_size as u32) - 1;
        if self.push_count > 0 {
            self.head = self.offset_from_head(1) as u8;
        } else {
            self.head = 0;
        }
        Some(value)
    }

    /// `i = 0` is the newest element, `i = max_size - 1` the oldest slot.
    pub fn get_from_head(&self, i: usize) -> T {
        self.array[self.offset_from_head(i)]
    }

    /// Oldest live element.
    pub fn tail(&self) -> Option<T> {
        match self.len() {
            0 => None,
            len => Some(self.get_from_head(len - 1)),
        }
    }

    pub fn is_full(&self) -> bool {
        self.push_count >= self.max_size as u32
    }

    pub fn head(&self) -> u8 {
        self.head
    }

    pub fn max_size(&self) -> u8 {
        self.max_size
    }

    pub fn push_count(&self) -> u32 {
        self.push_count
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        (self.push_count as usize).min(self.max_size as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.push_count == 0
    }

    /// Median of the live elements, `None` when nothing has been pushed.
    /// For an even count this is the upper of the two middle elements.
    pub fn median(&self) -> Option<T> {
        let len = self.len();
        let mut scratch = [T::default(); N];
        for (i, slot) in scratch.iter_mut().take(len).enumerate() {
            *slot = self.get_from_head(i);
        }
        quick_select(&mut scratch[..len], len / 2)
    }

    pub fn clear(&mut self) {
        self.array = [T::default(); N];
        self.head = 0;
        self.push_count = 0;
    }

    fn offset_from_head(&self, i: usize) -> usize {
        let max_size = self.max_size as usize;
        (self.head as usize + max_size - (i % max_size)) % max_size
    }
}

/// Returns the `k`-th smallest element (0-based) of `values`, reordering it in place.
///
/// Hoare's selection with a middle pivot and Lomuto partitioning.
pub fn quick_select<T: Copy + PartialOrd>(values: &mut [T], k: usize) -> Option<T> {
    if k >= values.len() {
        return None;
    }

    let mut left = 0;
    let mut right = values.len() - 1;
    loop {
        if left == right {
            return Some(values[left]);
        }

        let pivot_index = partition(values, left, right, left + (right - left) / 2);
        if k == pivot_index {
            return Some(values[k]);
        } else if k < pivot_index {
            right = pivot_index - 1;
        } else {
            left = pivot_index + 1;
        }
    }
}

fn partition<T: Copy + PartialOrd>(
    values: &mut [T],
    left: usize,
    right: usize,
    pivot_index: usize,
) -> usize {
    let pivot = values[pivot_index];
    values.swap(pivot_index, right);

    let mut store_index = left;
    for i in left..right {
        if values[i] < pivot {
            values.swap(store_index, i);
            store_index += 1;
        }
    }
    values.swap(right, store_index);
    store_index
}
