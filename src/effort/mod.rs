use crate::core::types::EffortLevel;

/// Maps a client temperature onto a reasoning effort level.
///
/// Lower temperature asks for more deterministic output, so it maps to more
/// deliberation. Each bracket is closed on its upper bound: `0.2` is
/// `Xhigh`, `0.4` is `High`, and so on. A missing or NaN temperature maps to
/// `Medium`.
pub fn map_temperature(temperature: Option<f64>) -> EffortLevel {
    let Some(temperature) = temperature.filter(|value| !value.is_nan()) else {
        return EffortLevel::Medium;
    };

    if temperature <= 0.2 {
        EffortLevel::Xhigh
    } else if temperature <= 0.4 {
        EffortLevel::High
    } else if temperature <= 0.6 {
        EffortLevel::Medium
    } else if temperature <= 0.8 {
        EffortLevel::Low
    } else {
        EffortLevel::Minimal
    }
}
