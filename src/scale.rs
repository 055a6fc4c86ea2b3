//! Linear mapping between numeric ranges.

/// A closed numeric interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Position of `x` inside the range, `0.0` at `min` and `1.0` at `max`
    pub fn to_percentage(&self, x: f32) -> f32 {
        (x - self.min) / self.span()
    }

    pub fn from_percentage(&self, p: f32) -> f32 {
        self.min + p * self.span()
    }
}

/// Maps values between an input range and an output range
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scale {
    pub input: Range,
    pub output: Range,
}

impl Scale {
    pub const fn new(input: Range, output: Range) -> Self {
        Self { input, output }
    }

    pub fn convert_to_input_range(&self, x: f32) -> f32 {
        convert(x, self.output, self.input)
    }

    pub fn convert_to_output_range(&self, x: f32) -> f32 {
        convert(x, self.input, self.output)
    }
}

fn convert(x: f32, from: Range, to: Range) -> f32 {
    // ratio first, so identical spans map exactly
    to.min + (x - from.min) * (to.span() / from.span())
}
