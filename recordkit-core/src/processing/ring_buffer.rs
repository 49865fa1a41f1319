/// Circular buffer of 16-bit PCM samples between a capture callback and a
/// blocking reader.
///
/// Not internally synchronized; wrap in `Arc<parking_lot::Mutex<_>>` for
/// cross-thread access. Overflow drops the oldest samples so a stalled
/// reader observes a gap rather than unbounded memory growth.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<i16>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write samples, dropping the oldest on overflow. A write larger than
    /// the whole buffer keeps only the tail.
    pub fn write(&mut self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        let samples = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += samples.len();
    }

    /// Read and remove up to `count` samples, fewer if fewer are available.
    pub fn read(&mut self, count: usize) -> Vec<i16> {
        let to_read = count.min(self.available);
        if to_read == 0 {
            return Vec::new();
        }

        let mut result = Vec::with_capacity(to_read);
        for i in 0..to_read {
            result.push(self.buffer[(self.read_index + i) % self.capacity]);
        }
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        result
    }

    /// Samples currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
