use uuid::Uuid;
use btleplug::api::bleuuid::uuid_from_u16;

/**
 * How often (milliseconds) to check the connection status while connected.
 */
pub const POLL_DELAY: u64 = 1000;

/**
 * How often (milliseconds) to poll the adapters for peripherals while scanning.
 */
pub const SCAN_POLL_DELAY: u64 = 500;

/**
 * How many scan polls before giving up on finding the device.
 */
pub const SCAN_ATTEMPTS: u32 = 20;

/**
 * The advertised name prefix of the fitness device ("Shape The World").
 */
pub const DEVICE_NAME_PREFIX: &str = "Shape";

/**
 * Number of plot display modes the firmware cycles through.
 */
pub const PLOT_MODE_COUNT: u8 = 3;

/**
 * 16-bit SIG identifiers of the Shape The World service and its
 * characteristics.
 */
pub const FITNESS_SERVICE: u16 = 0xFFF0;
pub const PLOT_STATE_CHARACTERISTIC: u16 = 0xFFF1;
pub const TIME_CHARACTERISTIC: u16 = 0xFFF2;
pub const SOUND_CHARACTERISTIC: u16 = 0xFFF3;
pub const TEMPERATURE_CHARACTERISTIC: u16 = 0xFFF4;
pub const LIGHT_CHARACTERISTIC: u16 = 0xFFF5;
pub const GRADER_CHARACTERISTIC: u16 = 0xFFF6;
pub const STEPS_CHARACTERISTIC: u16 = 0xFFF7;

pub fn fitness_service_uuid() -> Uuid {
    uuid_from_u16(FITNESS_SERVICE)
}
