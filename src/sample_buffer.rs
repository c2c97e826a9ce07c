//! Paired circular storage for raw thermocouple readings.

/// Two ring buffers (sensor and reference channel) sharing a single write
/// cursor.
///
/// Samples are only ever written as a pair, so index `i` of the sensor ring
/// always belongs to the same conversion round as index `i` of the
/// reference ring. The capacity is fixed; once full, the oldest pair is
/// overwritten.
#[derive(Clone, Debug)]
pub struct SampleBuffer<const N: usize> {
    sensor: [f32; N],
    reference: [f32; N],
    cursor: usize,
}

impl<const N: usize> SampleBuffer<N> {
    /// Creates a zeroed buffer with the cursor at 0.
    pub const fn new() -> Self {
        Self {
            sensor: [0.0; N],
            reference: [0.0; N],
            cursor: 0,
        }
    }

    /// Writes one paired sample at the cursor and advances it modulo `N`.
    pub fn push(&mut self, sensor: f32, reference: f32) {
        self.sensor[self.cursor] = sensor;
        self.reference[self.cursor] = reference;
        self.cursor = (self.cursor + 1) % N;
    }

    /// Moves the cursor back to 0. Stored values are left in place and will
    /// be overwritten by the next `N` pushes.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Index the next pair will be written to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The most recently written pair, `(sensor, reference)`.
    pub fn latest(&self) -> (f32, f32) {
        let idx = (self.cursor + N - 1) % N;
        (self.sensor[idx], self.reference[idx])
    }

    /// Arithmetic means of both rings, computed independently.
    pub fn means(&self) -> (f32, f32) {
        let sensor: f32 = self.sensor.iter().sum();
        let reference: f32 = self.reference.iter().sum();
        (sensor / N as f32, reference / N as f32)
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
