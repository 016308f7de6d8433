/// Buffer circulaire à capacité fixe (tableau + curseur d'écriture).
///
/// `push` est O(1) : une fois plein, chaque écriture écrase l'entrée la plus
/// ancienne. La mémoire ne croît jamais, même sur des sessions de plusieurs heures.
///
/// # Example
/// ```
/// use pb_core::ring::RingBuffer;
/// let mut ring = RingBuffer::new(3);
/// for v in 1..=5 {
///     ring.push(v);
/// }
/// assert_eq!(ring.len(), 3);
/// assert_eq!(ring.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
/// ```
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    cap: usize,
    write: usize,
    count: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Pre-allocate `capacity` slots. A capacity of 0 is coerced to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            buf: vec![T::default(); cap],
            cap,
            write: 0,
            count: 0,
        }
    }

    /// Append `value`, evicting the oldest entry when full.
    ///
    /// Returns the evicted value, if any.
    #[inline]
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.count == self.cap {
            Some(self.buf[self.write])
        } else {
            self.count += 1;
            None
        };
        self.buf[self.write] = value;
        self.write = (self.write + 1) % self.cap;
        evicted
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + Clone + '_ {
        let start = (self.write + self.cap - self.count) % self.cap;
        (0..self.count).map(move |i| self.buf[(start + i) % self.cap])
    }

    /// Most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.buf[(self.write + self.cap - 1) % self.cap])
        }
    }

    /// Drop every entry. Capacity is kept.
    pub fn clear(&mut self) {
        self.write = 0;
        self.count = 0;
    }
}

impl<T> RingBuffer<T> {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.cap
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cap
    }
}

impl RingBuffer<f32> {
    /// Arithmetic mean of the stored values, 0.0 when empty.
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let sum: f64 = self.iter().map(f64::from).sum();
        (sum / self.count as f64) as f32
    }
}
