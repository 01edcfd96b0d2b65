//! Fixed-capacity history of recent decibel readings.
//!
//! [`NoiseHistory`] is a FIFO ring buffer: when full, pushing a new reading
//! evicts the oldest one, so the most-recent `capacity` readings are always
//! available for rolling averages.  The consumer task is the only writer, so
//! no internal synchronisation is needed.

// ---------------------------------------------------------------------------
// NoiseHistory
// ---------------------------------------------------------------------------

/// Bounded, insertion-ordered store of decibel readings.
///
/// ## Overflow behaviour
///
/// `push` beyond `capacity` silently evicts the oldest reading.  The buffer
/// never allocates beyond its initial capacity and `len() <= capacity()`
/// holds after any sequence of pushes.
pub struct NoiseHistory {
    buf: Vec<f64>,
    capacity: usize,
    /// Index of the next write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid readings currently stored (≤ `capacity`).
    len: usize,
}

impl NoiseHistory {
    /// Create a history holding at most `capacity` readings.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "NoiseHistory capacity must be > 0");
        Self {
            buf: vec![0.0; capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append a reading, evicting the oldest one when full.
    pub fn push(&mut self, decibels: f64) {
        self.buf[self.write_pos] = decibels;
        self.write_pos = (self.write_pos + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// The `n` most recent readings in chronological order (oldest first).
    ///
    /// # Panics
    ///
    /// Panics if `n > len()`.  The aggregation path only asks for the last
    /// `aggregation_interval` readings once at least that many exist.
    pub fn last_n(&self, n: usize) -> Vec<f64> {
        assert!(n <= self.len, "last_n({n}) exceeds stored readings ({})", self.len);

        // write_pos is one past the newest reading; walk back n slots.
        let start = (self.write_pos + self.capacity - n) % self.capacity;
        (0..n)
            .map(|i| self.buf[(start + i) % self.capacity])
            .collect()
    }

    /// Arithmetic mean of the `n` most recent readings.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0` or `n > len()`.
    pub fn mean_of_last(&self, n: usize) -> f64 {
        assert!(n > 0, "mean_of_last requires n > 0");
        let window = self.last_n(n);
        window.iter().sum::<f64>() / n as f64
    }

    /// Number of readings currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no readings have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of readings the history can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
