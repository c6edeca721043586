//! Board-sourced tuning parameters.
//!
//! Values normally come from the board description. Anything left out falls
//! back to the defaults below, which suit the reference SDHCI PHY.

use core::fmt;

use crate::delay::{AXIS_END, DelayCode};

/// Default RX delay-line reference selector.
pub const DEFAULT_RX_REFERENCE_LINE: u8 = 0x09;
/// Default minimum window width for a window to be ranked.
pub const DEFAULT_WINDOW_LIMIT: u16 = 80;
/// Default TX delay-line reference selector.
pub const DEFAULT_TX_REFERENCE_LINE: u8 = 0x00;
/// Default fixed TX delay.
pub const DEFAULT_TX_DELAY: DelayCode = DelayCode::new(127);

/// Rejected configuration values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No window can be wider than the axis.
    WindowLimitTooLarge { limit: u16 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::WindowLimitTooLarge { limit } => write!(
                f,
                "window limit {limit} exceeds the delay axis ({AXIS_END} codes)"
            ),
        }
    }
}

/// Static tuning parameters for one controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningConfig {
    pub rx_reference_line: u8,
    pub window_limit: u16,
    pub tx_reference_line: u8,
    pub tx_delay: DelayCode,
    /// Set when an external PHY owns the TX path; TX setup is skipped.
    pub phy_module: bool,
}

impl TuningConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rx_reference_line: DEFAULT_RX_REFERENCE_LINE,
            window_limit: DEFAULT_WINDOW_LIMIT,
            tx_reference_line: DEFAULT_TX_REFERENCE_LINE,
            tx_delay: DEFAULT_TX_DELAY,
            phy_module: false,
        }
    }

    #[must_use]
    pub const fn with_rx_reference_line(mut self, line: u8) -> Self {
        self.rx_reference_line = line;
        self
    }

    #[must_use]
    pub const fn with_window_limit(mut self, limit: u16) -> Self {
        self.window_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_tx_reference_line(mut self, line: u8) -> Self {
        self.tx_reference_line = line;
        self
    }

    #[must_use]
    pub const fn with_tx_delay(mut self, code: DelayCode) -> Self {
        self.tx_delay = code;
        self
    }

    #[must_use]
    pub const fn with_phy_module(mut self, phy_module: bool) -> Self {
        self.phy_module = phy_module;
        self
    }

    /// Checks the configuration before it is handed to an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WindowLimitTooLarge`] for limits above 256.
    pub const fn validate(self) -> Result<Self, ConfigError> {
        if self.window_limit > AXIS_END {
            return Err(ConfigError::WindowLimitTooLarge {
                limit: self.window_limit,
            });
        }
        Ok(self)
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_board_reference() {
        let config = TuningConfig::default();
        assert_eq!(config.rx_reference_line, 0x09);
        assert_eq!(config.window_limit, 80);
        assert_eq!(config.tx_reference_line, 0x00);
        assert_eq!(config.tx_delay, DelayCode::new(127));
        assert!(!config.phy_module);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = TuningConfig::new()
            .with_window_limit(40)
            .with_tx_delay(DelayCode::new(90))
            .with_phy_module(true);
        assert_eq!(config.window_limit, 40);
        assert_eq!(config.tx_delay.value(), 90);
        assert!(config.phy_module);
    }

    #[test]
    fn validate_bounds_window_limit() {
        assert!(TuningConfig::new().with_window_limit(0).validate().is_ok());
        assert!(TuningConfig::new().with_window_limit(256).validate().is_ok());
        assert_eq!(
            TuningConfig::new().with_window_limit(257).validate(),
            Err(ConfigError::WindowLimitTooLarge { limit: 257 })
        );
    }
}
