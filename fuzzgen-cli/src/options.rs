//! Run-wide switches threaded through both wrappers.

#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Append an 8-char hash to result directory names so parallel runs
    /// cannot collide.
    pub random_names: bool,
    /// Delete registered temporaries when the run ends.
    pub auto_delete: bool,
    /// Reuse an existing result directory instead of failing.
    pub overwrite: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            random_names: true,
            auto_delete: false,
            overwrite: false,
        }
    }
}
