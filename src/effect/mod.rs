//! Effect catalog with compile-time known reference effects
//!
//! Reference effects are identified by small positive integers (the wire
//! format) and by a stable snake_case name. Each one expands into an
//! [`Action`] tree; the [`EffectCatalog`] maps identifiers to those trees
//! and may carry extra registrations.

mod catalog;
mod mood;
mod reference;

pub use catalog::EffectCatalog;

use crate::action::Action;

const EFFECT_NAME_DROWSY: &str = "drowsy";
const EFFECT_NAME_LIVELY: &str = "lively";
const EFFECT_NAME_FOCUS: &str = "focus";
const EFFECT_NAME_RELAX: &str = "relax";
const EFFECT_NAME_UPLIFT: &str = "uplift";
const EFFECT_NAME_ALL_OFF: &str = "all_off";
const EFFECT_NAME_ALL_ON: &str = "all_on";
const EFFECT_NAME_CALM: &str = "calm";
const EFFECT_NAME_EXCITED: &str = "excited";
const EFFECT_NAME_MELANCHOLY: &str = "melancholy";
const EFFECT_NAME_CONCENTRATE: &str = "concentrate";

const EFFECT_ID_DROWSY: u8 = 1;
const EFFECT_ID_LIVELY: u8 = 2;
const EFFECT_ID_FOCUS: u8 = 3;
const EFFECT_ID_RELAX: u8 = 4;
const EFFECT_ID_UPLIFT: u8 = 5;
const EFFECT_ID_ALL_OFF: u8 = 6;
const EFFECT_ID_ALL_ON: u8 = 7;
const EFFECT_ID_CALM: u8 = 8;
const EFFECT_ID_EXCITED: u8 = 9;
const EFFECT_ID_MELANCHOLY: u8 = 10;
const EFFECT_ID_CONCENTRATE: u8 = 11;

/// Known reference effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EffectId {
    /// Red breathes slowly, then fades out
    Drowsy = EFFECT_ID_DROWSY,
    /// Green on, blue blinks fast
    Lively = EFFECT_ID_LIVELY,
    /// Red and green at 70%
    Focus = EFFECT_ID_FOCUS,
    /// Every channel breathes with a staggered start, then all fade out
    Relax = EFFECT_ID_RELAX,
    /// Blue breathes, then brightens fully
    Uplift = EFFECT_ID_UPLIFT,
    AllOff = EFFECT_ID_ALL_OFF,
    AllOn = EFFECT_ID_ALL_ON,
    /// Slow shallow breathing on every channel
    Calm = EFFECT_ID_CALM,
    /// Fast layered flicker on every channel
    Excited = EFFECT_ID_EXCITED,
    /// Dim irregular drift on every channel
    Melancholy = EFFECT_ID_MELANCHOLY,
    /// Stepped focus pulse on every channel
    Concentrate = EFFECT_ID_CONCENTRATE,
}

impl EffectId {
    pub const ALL: [EffectId; 11] = [
        Self::Drowsy,
        Self::Lively,
        Self::Focus,
        Self::Relax,
        Self::Uplift,
        Self::AllOff,
        Self::AllOn,
        Self::Calm,
        Self::Excited,
        Self::Melancholy,
        Self::Concentrate,
    ];

    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            EFFECT_ID_DROWSY => Self::Drowsy,
            EFFECT_ID_LIVELY => Self::Lively,
            EFFECT_ID_FOCUS => Self::Focus,
            EFFECT_ID_RELAX => Self::Relax,
            EFFECT_ID_UPLIFT => Self::Uplift,
            EFFECT_ID_ALL_OFF => Self::AllOff,
            EFFECT_ID_ALL_ON => Self::AllOn,
            EFFECT_ID_CALM => Self::Calm,
            EFFECT_ID_EXCITED => Self::Excited,
            EFFECT_ID_MELANCHOLY => Self::Melancholy,
            EFFECT_ID_CONCENTRATE => Self::Concentrate,
            _ => return None,
        })
    }

    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drowsy => EFFECT_NAME_DROWSY,
            Self::Lively => EFFECT_NAME_LIVELY,
            Self::Focus => EFFECT_NAME_FOCUS,
            Self::Relax => EFFECT_NAME_RELAX,
            Self::Uplift => EFFECT_NAME_UPLIFT,
            Self::AllOff => EFFECT_NAME_ALL_OFF,
            Self::AllOn => EFFECT_NAME_ALL_ON,
            Self::Calm => EFFECT_NAME_CALM,
            Self::Excited => EFFECT_NAME_EXCITED,
            Self::Melancholy => EFFECT_NAME_MELANCHOLY,
            Self::Concentrate => EFFECT_NAME_CONCENTRATE,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }

    /// Expand into the effect's action tree
    pub fn to_action(self) -> Action {
        match self {
            Self::Drowsy => reference::drowsy(),
            Self::Lively => reference::lively(),
            Self::Focus => reference::focus(),
            Self::Relax => reference::relax(),
            Self::Uplift => reference::uplift(),
            Self::AllOff => reference::all_off(),
            Self::AllOn => reference::all_on(),
            Self::Calm => mood::calm(),
            Self::Excited => mood::excited(),
            Self::Melancholy => mood::melancholy(),
            Self::Concentrate => mood::concentrate(),
        }
    }
}
