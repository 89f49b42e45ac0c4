//! Calculator memory register
//!
//! A single `f64` cell behind the `M+`, `M-`, `MR` and `MC` keys. The cell
//! knows nothing about expressions: operands arrive already evaluated, so it
//! has no error conditions of its own.

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryCell {
    value: f64,
}

impl MemoryCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `x` to the stored value and return the new value
    pub fn madd(&mut self, x: f64) -> f64 {
        self.value += x;
        self.value
    }

    /// Subtract `x` from the stored value and return the new value
    pub fn msub(&mut self, x: f64) -> f64 {
        self.value -= x;
        self.value
    }

    pub fn recall(&self) -> f64 {
        self.value
    }

    /// Reset to zero; returns the new value (always 0)
    pub fn clear(&mut self) -> f64 {
        self.value = 0.0;
        self.value
    }
}
