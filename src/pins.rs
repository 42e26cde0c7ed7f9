//! GPIO / peripheral pin assignments for the SoilWatch board (ESP32 DevKit).
//!
//! Default values only. The live assignment is carried by
//! [`PinAssignments`](crate::config::PinAssignments) inside the system
//! configuration so a board variant can override it without a rebuild of
//! the drivers.

// ---------------------------------------------------------------------------
// Nutrient presence inputs (active-low push-buttons with internal pull-up)
// ---------------------------------------------------------------------------

/// Phosphorus presence line. LOW = nutrient present.
pub const PHOSPHORUS_GPIO: i32 = 12;
/// Potassium presence line. LOW = nutrient present.
pub const POTASSIUM_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Sensors: Analog (ADC1)
// ---------------------------------------------------------------------------

/// pH probe analog output. GPIO 34 is input-only and maps to ADC1 channel 6.
pub const PH_ADC_GPIO: i32 = 34;
/// ADC1 channel backing [`PH_ADC_GPIO`].
pub const PH_ADC1_CHANNEL: u32 = 6;

// ---------------------------------------------------------------------------
// Sensors: Digital
// ---------------------------------------------------------------------------

/// DHT22 single-wire temperature / humidity probe (bidirectional pin).
pub const DHT22_GPIO: i32 = 23;

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Irrigation relay coil driver. HIGH = relay energised = water flowing.
pub const IRRIGATION_RELAY_GPIO: i32 = 27;
/// Indicator LED (active HIGH).
pub const INDICATOR_LED_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// ADC configuration
// ---------------------------------------------------------------------------

/// Full-scale code of the 12-bit ADC.
pub const ADC_MAX_CODE: u16 = 4095;
