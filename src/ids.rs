//! Display identifiers for students (`EST001`, `EST002`, ...).
//!
//! The number is derived from the size of the local store, so two sessions
//! with the same student count hand out the same identifier, and a deletion
//! followed by an insertion can reuse one. Set `ids.policy = "server"` to let
//! the authoritative store assign it instead.

pub const DEFAULT_PREFIX: &str = "EST";
pub const DEFAULT_WIDTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayIdGenerator {
    prefix: String,
    width: usize,
}

impl Default for DisplayIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_WIDTH)
    }
}

impl DisplayIdGenerator {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    /// Identifier for the record that will follow `current_count` existing ones.
    pub fn next(&self, current_count: usize) -> String {
        self.format(current_count as u64 + 1)
    }

    pub fn format(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.width)
    }
}

/// `next` with the default prefix and width.
pub fn next_display_id(current_count: usize) -> String {
    DisplayIdGenerator::default().next(current_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_three_digits() {
        assert_eq!(next_display_id(0), "EST001");
        assert_eq!(next_display_id(2), "EST003");
        assert_eq!(next_display_id(98), "EST099");
    }

    #[test]
    fn wider_numbers_are_not_truncated() {
        assert_eq!(next_display_id(999), "EST1000");
    }

    #[test]
    fn custom_prefix_and_width() {
        let ids = DisplayIdGenerator::new("ALU", 5);
        assert_eq!(ids.next(41), "ALU00042");
    }
}
