use crate::config::LedgerConfig;
use log::info;

/// Negative-feedback controller keeping block times inside
/// `[min_block_gap_ms, max_block_gap_ms]`, one step per accepted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyAdjustment {
    min_gap_ms: u64,
    max_gap_ms: u64,
    min_complexity: u32,
    max_complexity: u32,
}

impl DifficultyAdjustment {
    pub fn from_config(config: &LedgerConfig) -> DifficultyAdjustment {
        DifficultyAdjustment {
            min_gap_ms: config.min_block_gap_ms,
            max_gap_ms: config.max_block_gap_ms,
            min_complexity: config.min_complexity,
            max_complexity: config.max_complexity,
        }
    }

    /// Complexity for the next epoch given the time since the previous block
    pub fn next_complexity(&self, current: u32, gap_ms: u64) -> u32 {
        let next = if gap_ms < self.min_gap_ms && current < self.max_complexity {
            current + 1
        } else if gap_ms > self.max_gap_ms && current > self.min_complexity {
            current - 1
        } else {
            current
        };

        if next != current {
            info!(
                "Complexity adjusted: {current} -> {next} (block gap: {} seconds)",
                gap_ms / 1000
            );
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjustment() -> DifficultyAdjustment {
        DifficultyAdjustment::from_config(&LedgerConfig::default())
    }

    #[test]
    fn test_fast_blocks_raise_complexity() {
        assert_eq!(adjustment().next_complexity(3, 1_000), 4);
    }

    #[test]
    fn test_slow_blocks_lower_complexity() {
        assert_eq!(adjustment().next_complexity(3, 45_000), 2);
    }

    #[test]
    fn test_gap_inside_band_keeps_complexity() {
        let adjustment = adjustment();
        assert_eq!(adjustment.next_complexity(3, 5_000), 3);
        assert_eq!(adjustment.next_complexity(3, 12_000), 3);
        assert_eq!(adjustment.next_complexity(3, 30_000), 3);
    }

    #[test]
    fn test_difficulty_bounds() {
        let adjustment = adjustment();
        assert_eq!(adjustment.next_complexity(5, 0), 5);
        assert_eq!(adjustment.next_complexity(0, u64::MAX), 0);

        let capped = DifficultyAdjustment::from_config(&LedgerConfig {
            min_complexity: 1,
            max_complexity: 6,
            ..LedgerConfig::default()
        });
        assert_eq!(capped.next_complexity(1, u64::MAX), 1);
        assert_eq!(capped.next_complexity(5, 0), 6);
    }
}
