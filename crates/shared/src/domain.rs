use serde::{Deserialize, Serialize};

/// Maximum accepted message length, counted in UTF-16 code units to match
/// the service-side limit.
pub const MAX_MESSAGE_UTF16_UNITS: usize = 1000;

macro_rules! open_level {
    ($name:ident, $($const_name:ident = $value:literal),+ $(,)?) => {
        /// Open string set: the service may introduce values beyond the
        /// known constants, and unknown values are valid but unstyled.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            $(pub const $const_name: &'static str = $value;)+

            /// Raw enumerant used for styling lookups; never case-normalized.
            pub fn style_key(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

open_level!(Urgency, ROUTINE = "routine", URGENT = "urgent", EMERGENCY = "emergency");
open_level!(RiskLevel, LOW = "low", MEDIUM = "medium", HIGH = "high");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Greeting,
    Normal,
    Emergency,
}

/// Input-length bands mirroring the composer counter thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharCountLevel {
    Normal,
    Elevated,
    NearLimit,
}

pub fn char_count_level(utf16_units: usize) -> CharCountLevel {
    let max = MAX_MESSAGE_UTF16_UNITS;
    if utf16_units * 10 > max * 9 {
        CharCountLevel::NearLimit
    } else if utf16_units * 10 > max * 7 {
        CharCountLevel::Elevated
    } else {
        CharCountLevel::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_style_key_preserves_raw_value() {
        let risk = RiskLevel::from(RiskLevel::HIGH);
        assert_eq!(risk.style_key(), "high");
        let unknown = Urgency::from("see-specialist");
        assert_eq!(unknown.style_key(), "see-specialist");
    }

    #[test]
    fn char_count_bands_follow_thresholds() {
        assert_eq!(char_count_level(0), CharCountLevel::Normal);
        assert_eq!(char_count_level(700), CharCountLevel::Normal);
        assert_eq!(char_count_level(701), CharCountLevel::Elevated);
        assert_eq!(char_count_level(900), CharCountLevel::Elevated);
        assert_eq!(char_count_level(901), CharCountLevel::NearLimit);
        assert_eq!(char_count_level(1000), CharCountLevel::NearLimit);
    }
}
