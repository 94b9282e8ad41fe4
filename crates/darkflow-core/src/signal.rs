//! Signal classification and positioning context.
//!
//! A [`SignalStrategy`] maps the latest ratios of one symbol to exactly one
//! [`Signal`]. Rules are evaluated top to bottom and the first match wins;
//! every comparison is strict, so a value sitting exactly on a threshold
//! never satisfies that rule.

use serde::{Deserialize, Serialize};

use crate::{LatestRatios, ShortInterestSnapshot, SymbolAnalysisResult};

/// Off-exchange ratio at which the quadrant flips to the institutional side.
pub const QUADRANT_OFF_EXCHANGE_RATIO: f64 = 45.0;
/// Off-exchange short ratio at which the quadrant flips to the short side.
pub const QUADRANT_SHORT_RATIO: f64 = 50.0;

/// Classifier constants. `Default` holds the published policy values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// Off-exchange ratio above which institutional rules apply.
    pub institutional_off_exchange_ratio: f64,
    /// Off-exchange short ratio above which positioning reads bearish.
    pub bearish_short_ratio: f64,
    /// Off-exchange short ratio below which positioning reads as accumulation.
    pub accumulation_short_ratio: f64,
    /// Concentration spread above which shorting is concentrated off-exchange.
    pub off_exchange_concentration_spread: f64,
    /// Concentration spread below which shorting is concentrated on exchange.
    pub on_exchange_concentration_spread: f64,
    /// Change versus the ten-day average below which positions are unwinding.
    pub sharp_decline_change: f64,
    pub squeeze_days_to_cover: f64,
    pub extreme_days_to_cover: f64,
    pub low_days_to_cover: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            institutional_off_exchange_ratio: 50.0,
            bearish_short_ratio: 55.0,
            accumulation_short_ratio: 45.0,
            off_exchange_concentration_spread: 5.0,
            on_exchange_concentration_spread: -5.0,
            sharp_decline_change: -5.0,
            squeeze_days_to_cover: 5.0,
            extreme_days_to_cover: 7.0,
            low_days_to_cover: 3.0,
        }
    }
}

/// Classification outcome, carrying the thresholds that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    SharpDecline {
        change_below: f64,
    },
    InstitutionalBearish {
        off_exchange_ratio_above: f64,
        short_ratio_above: f64,
    },
    InstitutionalAccumulation {
        off_exchange_ratio_above: f64,
        short_ratio_below: f64,
    },
    ConcentratedOffExchange {
        spread_above: f64,
    },
    ConcentratedOnExchange {
        spread_below: f64,
    },
    SqueezeImminent {
        days_to_cover_above: f64,
        change_below: f64,
    },
    ExtremeShortInterest {
        days_to_cover_above: f64,
    },
    LowShortInterest {
        days_to_cover_below: f64,
    },
    Neutral,
}

impl Signal {
    /// Stable identifier, identical to the serialized `kind` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SharpDecline { .. } => "sharp_decline",
            Self::InstitutionalBearish { .. } => "institutional_bearish",
            Self::InstitutionalAccumulation { .. } => "institutional_accumulation",
            Self::ConcentratedOffExchange { .. } => "concentrated_off_exchange",
            Self::ConcentratedOnExchange { .. } => "concentrated_on_exchange",
            Self::SqueezeImminent { .. } => "squeeze_imminent",
            Self::ExtremeShortInterest { .. } => "extreme_short_interest",
            Self::LowShortInterest { .. } => "low_short_interest",
            Self::Neutral => "neutral",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::SharpDecline { .. } => "sharp decline, possible unwind",
            Self::InstitutionalBearish { .. } => "strong institutional bearish positioning",
            Self::InstitutionalAccumulation { .. } => "possible institutional accumulation",
            Self::ConcentratedOffExchange { .. } => "short interest concentrated off-exchange",
            Self::ConcentratedOnExchange { .. } => "short interest concentrated on public exchange",
            Self::SqueezeImminent { .. } => "high days-to-cover while off-exchange shorting drops",
            Self::ExtremeShortInterest { .. } => "extreme short interest",
            Self::LowShortInterest { .. } => "low short interest",
            Self::Neutral => "neutral, no signal",
        }
    }
}

/// Everything a strategy may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalInput {
    pub latest: LatestRatios,
    pub change_vs_ten_day_average: f64,
    pub short_interest: Option<ShortInterestSnapshot>,
}

impl SignalInput {
    /// Days-to-cover, zero when no snapshot is available or it is degraded.
    pub fn days_to_cover(&self) -> f64 {
        self.short_interest
            .filter(|snapshot| !snapshot.degraded)
            .map(|snapshot| snapshot.days_to_cover)
            .unwrap_or(0.0)
    }

    fn has_short_interest(&self) -> bool {
        self.short_interest.is_some_and(|snapshot| !snapshot.degraded)
    }
}

impl From<&SymbolAnalysisResult> for SignalInput {
    fn from(result: &SymbolAnalysisResult) -> Self {
        Self {
            latest: result.latest,
            change_vs_ten_day_average: result.change_vs_ten_day_average,
            short_interest: result.short_interest,
        }
    }
}

/// Pluggable rule table. Implementations must be total: every input maps to
/// exactly one signal.
pub trait SignalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, input: &SignalInput) -> Signal;

    fn classify_result(&self, result: &SymbolAnalysisResult) -> Signal {
        self.classify(&SignalInput::from(result))
    }
}

/// Ratio-only rules.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StandardStrategy {
    pub thresholds: SignalThresholds,
}

impl StandardStrategy {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }
}

impl SignalStrategy for StandardStrategy {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn classify(&self, input: &SignalInput) -> Signal {
        let t = &self.thresholds;
        if let Some(signal) = sharp_decline(t, input) {
            return signal;
        }
        if let Some(signal) = institutional(t, input) {
            return signal;
        }

        let spread = input.latest.concentration_spread();
        if spread > t.off_exchange_concentration_spread {
            return Signal::ConcentratedOffExchange {
                spread_above: t.off_exchange_concentration_spread,
            };
        }
        if spread < t.on_exchange_concentration_spread {
            return Signal::ConcentratedOnExchange {
                spread_below: t.on_exchange_concentration_spread,
            };
        }
        Signal::Neutral
    }
}

/// Ratio rules with higher-priority days-to-cover branches.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShortInterestStrategy {
    pub thresholds: SignalThresholds,
}

impl ShortInterestStrategy {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }
}

impl SignalStrategy for ShortInterestStrategy {
    fn name(&self) -> &'static str {
        "short-interest"
    }

    fn classify(&self, input: &SignalInput) -> Signal {
        let t = &self.thresholds;
        let days_to_cover = input.days_to_cover();

        if days_to_cover > t.squeeze_days_to_cover
            && input.change_vs_ten_day_average < t.sharp_decline_change
        {
            return Signal::SqueezeImminent {
                days_to_cover_above: t.squeeze_days_to_cover,
                change_below: t.sharp_decline_change,
            };
        }
        if let Some(signal) = sharp_decline(t, input) {
            return signal;
        }
        if days_to_cover > t.extreme_days_to_cover {
            return Signal::ExtremeShortInterest {
                days_to_cover_above: t.extreme_days_to_cover,
            };
        }
        if let Some(signal) = institutional(t, input) {
            return signal;
        }
        if input.has_short_interest() && days_to_cover < t.low_days_to_cover {
            return Signal::LowShortInterest {
                days_to_cover_below: t.low_days_to_cover,
            };
        }
        Signal::Neutral
    }
}

fn sharp_decline(t: &SignalThresholds, input: &SignalInput) -> Option<Signal> {
    (input.change_vs_ten_day_average < t.sharp_decline_change).then_some(Signal::SharpDecline {
        change_below: t.sharp_decline_change,
    })
}

fn institutional(t: &SignalThresholds, input: &SignalInput) -> Option<Signal> {
    let latest = &input.latest;
    if latest.off_exchange_ratio <= t.institutional_off_exchange_ratio {
        return None;
    }
    if latest.off_exchange_short_ratio > t.bearish_short_ratio {
        return Some(Signal::InstitutionalBearish {
            off_exchange_ratio_above: t.institutional_off_exchange_ratio,
            short_ratio_above: t.bearish_short_ratio,
        });
    }
    if latest.off_exchange_short_ratio < t.accumulation_short_ratio {
        return Some(Signal::InstitutionalAccumulation {
            off_exchange_ratio_above: t.institutional_off_exchange_ratio,
            short_ratio_below: t.accumulation_short_ratio,
        });
    }
    None
}

/// Where a symbol sits on the off-exchange ratio / short ratio plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositioningQuadrant {
    /// High off-exchange share, high short share.
    Distribution,
    /// High off-exchange share, low short share.
    Accumulation,
    /// Low off-exchange share, high short share.
    RetailShortPressure,
    RetailNeutral,
}

impl PositioningQuadrant {
    pub fn from_ratios(latest: &LatestRatios) -> Self {
        let institutional = latest.off_exchange_ratio >= QUADRANT_OFF_EXCHANGE_RATIO;
        let short_heavy = latest.off_exchange_short_ratio >= QUADRANT_SHORT_RATIO;
        match (institutional, short_heavy) {
            (true, true) => Self::Distribution,
            (true, false) => Self::Accumulation,
            (false, true) => Self::RetailShortPressure,
            (false, false) => Self::RetailNeutral,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Distribution => "distribution",
            Self::Accumulation => "accumulation",
            Self::RetailShortPressure => "retail_short_pressure",
            Self::RetailNeutral => "retail_neutral",
        }
    }
}
