use std::fmt;
use uuid::Uuid;
use btleplug::api::bleuuid::uuid_from_u16;

use crate::device::constants::{
    GRADER_CHARACTERISTIC, LIGHT_CHARACTERISTIC, PLOT_STATE_CHARACTERISTIC, SOUND_CHARACTERISTIC,
    STEPS_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC, TIME_CHARACTERISTIC,
};

/**
 * The logical features of the fitness device, one per GATT characteristic.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    PlotState,
    Time,
    Sound,
    Temperature,
    Light,
    Grader,
    Steps,
}

impl Feature {
    /**
     * The fixed discovery order. Later lookups are skipped as soon as one
     * fails, so the session is all-or-nothing.
     */
    pub const DISCOVERY_ORDER: [Feature; 7] = [
        Feature::PlotState,
        Feature::Time,
        Feature::Sound,
        Feature::Temperature,
        Feature::Light,
        Feature::Grader,
        Feature::Steps,
    ];

    pub fn short_uuid(self) -> u16 {
        match self {
            Feature::PlotState => PLOT_STATE_CHARACTERISTIC,
            Feature::Time => TIME_CHARACTERISTIC,
            Feature::Sound => SOUND_CHARACTERISTIC,
            Feature::Temperature => TEMPERATURE_CHARACTERISTIC,
            Feature::Light => LIGHT_CHARACTERISTIC,
            Feature::Grader => GRADER_CHARACTERISTIC,
            Feature::Steps => STEPS_CHARACTERISTIC,
        }
    }

    pub fn uuid(self) -> Uuid {
        uuid_from_u16(self.short_uuid())
    }

    pub fn readable(self) -> bool {
        matches!(
            self,
            Feature::Time | Feature::Sound | Feature::Temperature | Feature::Light
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::PlotState => "plot state",
            Feature::Time => "time",
            Feature::Sound => "sound",
            Feature::Temperature => "temperature",
            Feature::Light => "light",
            Feature::Grader => "grader",
            Feature::Steps => "steps",
        };

        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Scanning,
    Connecting,
    Discovering,
    Ready,
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    StateChange(DeviceState),
    FeatureFound(Feature),
    Reading { feature: Feature, value: u32 },
    PlotMode(u8),
    Steps(i16),
    StepsNotifying(bool),
}

#[derive(Debug, Clone)]
pub enum DeviceCommand {
    ToggleConnection,
    ReadFeature(Feature),
    ChangePlotMode(PlotDirection),
    ActivateGrader(u16),
    ToggleStepsNotification,
}
