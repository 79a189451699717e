// ===============================
// src/window.rs
// ===============================
//
// Ring buffer dengan running sum: push/evict O(1).
//
// Invariant: `sum == buf[0..count].sum()` setelah setiap mutasi, `count`
// saturasi di `capacity` dan tidak pernah turun.
//
// Rata-rata pakai integer division (truncating). Ini aproksimasi yang
// disengaja, harga sudah dalam minor unit.
//

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    buf: Vec<i64>,
    cursor: usize,
    count: usize,
    sum: i64,
}

impl SlidingWindow {
    /// `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        Self { buf: vec![0; capacity.max(1)], cursor: 0, count: 0, sum: 0 }
    }

    /// Push a sample, evicting the oldest one once full. Returns the new average.
    pub fn push(&mut self, value: i64) -> i64 {
        if self.count < self.buf.len() {
            self.count += 1;
        } else {
            self.sum -= self.buf[self.cursor];
        }
        self.buf[self.cursor] = value;
        self.sum += value;
        self.cursor = (self.cursor + 1) % self.buf.len();
        self.sum / self.count as i64
    }

    /// `None` until the first push.
    #[cfg(test)]
    pub fn average(&self) -> Option<i64> {
        if self.count == 0 { None } else { Some(self.sum / self.count as i64) }
    }

    pub fn sum(&self) -> i64 { self.sum }
    pub fn is_full(&self) -> bool { self.count == self.buf.len() }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.count }

    /// Raw slot access; unwritten slots read as zero.
    #[cfg(test)]
    pub fn slot(&self, idx: usize) -> i64 { self.buf[idx % self.buf.len()] }

    /// Oldest retained sample. Once full, that is the slot under the cursor.
    pub fn oldest(&self) -> Option<i64> {
        match self.count {
            0 => None,
            n if n == self.buf.len() => Some(self.buf[self.cursor]),
            _ => Some(self.buf[0]),
        }
    }
}
