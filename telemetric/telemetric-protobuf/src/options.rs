/// Output options shared by the compact and key-value decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Emit only the first row of each compact table and only the first
    /// top-level key-value field.
    ///
    /// Applies to both the text rendering and the [`Value`] projection.
    ///
    /// [`Value`]: telemetric_core::Value
    pub brief: bool,
}

impl DecodeOptions {
    pub fn brief() -> Self {
        Self { brief: true }
    }

    pub fn all() -> Self {
        Self { brief: false }
    }

    /// Number of items to emit out of `len`.
    pub(crate) fn limit(self, len: usize) -> usize {
        if self.brief { len.min(1) } else { len }
    }
}
