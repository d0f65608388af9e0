//! Local informativeness check. No model call, no token cost.

/// Trimmed characters a transcript needs before it is worth analysing
pub const DEFAULT_MIN_INFORMATIVE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct InformativeGate {
    min_chars: usize,
}

impl Default for InformativeGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INFORMATIVE_CHARS)
    }
}

impl InformativeGate {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn check(&self, transcript: &str) -> bool {
        let trimmed = transcript.trim();
        !trimmed.is_empty() && trimmed.chars().count() >= self.min_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace_are_not_informative() {
        let gate = InformativeGate::default();
        assert!(!gate.check(""));
        assert!(!gate.check("   \n\t  "));
    }

    #[test]
    fn test_threshold_uses_trimmed_length() {
        let gate = InformativeGate::new(10);
        assert!(!gate.check("   short   "));
        assert!(gate.check("exactly 10"));
        assert!(gate.check("  this one is long enough  "));
    }

    #[test]
    fn test_threshold_counts_characters() {
        let gate = InformativeGate::new(5);
        // 4 characters, 8 bytes
        assert!(!gate.check("éééé"));
    }

    #[test]
    fn test_zero_threshold_still_rejects_blank() {
        let gate = InformativeGate::new(0);
        assert!(!gate.check("  "));
        assert!(gate.check("x"));
    }
}
