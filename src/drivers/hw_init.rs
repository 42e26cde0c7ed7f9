//! One-shot hardware peripheral initialization and raw pin access.
//!
//! Configures the ADC1 oneshot unit, the nutrient input lines and the two
//! output lines using raw ESP-IDF sys calls, and provides the DHT22
//! single-wire read. Called once from `main()` before the tasks start.
//!
//! On the host every primitive is backed by atomics that tests drive through
//! the `sim_*` setters.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::config::PinAssignments;
use crate::error::SensorError;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::AdcInitFailed(_) => Self::Init("ADC1 init failed"),
            HwInitError::GpioConfigFailed(_) => Self::Init("GPIO config failed"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals(pins: &PinAssignments) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any task is spawned.
    unsafe {
        init_adc(pins.ph_adc_channel)?;
        init_gpio_inputs(&[pins.phosphorus_gpio, pins.potassium_gpio])?;
        init_gpio_outputs(&[
            (pins.relay_gpio, !pins.relay_active_high),
            (pins.indicator_gpio, false),
        ])?;
        init_dht22_line(pins.dht22_gpio)?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(pins: &PinAssignments) -> Result<(), HwInitError> {
    // Relay line idles released.
    gpio_write(pins.relay_gpio, !pins.relay_active_high);
    gpio_write(pins.indicator_gpio, false);
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: ADC1_HANDLE is written once in `init_adc()` before the
/// acquisition task exists; the acquisition task is the only reader.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc(channel: u32) -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    // 12 dB attenuation gives the full 0..3.3 V probe swing.
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=pH)", channel);
    Ok(())
}

/// Single 12-bit conversion. A failed conversion reads as 0.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, acquisition task only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.clamp(0, i32::from(crate::pins::ADC_MAX_CODE)) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(channel: u32) -> u16 {
    sim::ADC
        .get(channel as usize)
        .map_or(0, |a| a.load(core::sync::atomic::Ordering::Relaxed))
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs(input_pins: &[i32]) -> Result<(), HwInitError> {
    for &pin in input_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }
    info!("hw_init: nutrient inputs configured (pull-up, active low)");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs(output_pins: &[(i32, bool)]) -> Result<(), HwInitError> {
    for &(pin, idle_high) in output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            // Input+output so the level register can be read back.
            mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, u32::from(idle_high)) };
    }
    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_dht22_line(pin: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // Open drain released = bus idles high through the pull-up.
    unsafe { gpio_set_level(pin, 1) };
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on a configured pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim::GPIO_LEVELS.load(core::sync::atomic::Ordering::Relaxed) & (1u64 << pin) != 0
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: pin was configured as an output in init_gpio_outputs();
    // each output line has exactly one owning driver.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    sim::set_gpio(pin, high);
}

// ── DHT22 single-wire ─────────────────────────────────────────

/// Decode a 5-byte DHT22 frame into (temperature °C, humidity %).
///
/// Byte 4 is the low byte of the sum of bytes 0..4. Temperature uses a
/// sign-magnitude encoding with the sign in the top bit.
pub fn decode_dht22_frame(frame: &[u8; 5]) -> Result<(f32, f32), SensorError> {
    let sum = frame[..4]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::ChecksumMismatch);
    }
    let humidity = f32::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
    let magnitude = f32::from(u16::from_be_bytes([frame[2] & 0x7F, frame[3]])) / 10.0;
    let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };
    Ok((temperature, humidity))
}

/// Encode (temperature, humidity) the way the probe puts it on the wire.
pub fn encode_dht22_frame(temperature_c: f32, humidity_pct: f32) -> [u8; 5] {
    let hum = (humidity_pct * 10.0).round().clamp(0.0, f32::from(u16::MAX)) as u16;
    let mut temp = (temperature_c.abs() * 10.0).round().clamp(0.0, 32_767.0) as u16;
    if temperature_c < 0.0 {
        temp |= 0x8000;
    }
    let [h0, h1] = hum.to_be_bytes();
    let [t0, t1] = temp.to_be_bytes();
    let sum = h0.wrapping_add(h1).wrapping_add(t0).wrapping_add(t1);
    [h0, h1, t0, t1, sum]
}

/// Wait until the line leaves `level`; returns microseconds spent at it.
#[cfg(target_os = "espidf")]
fn wait_while_level(pin: i32, level: bool, timeout_us: i64) -> Result<i64, SensorError> {
    // SAFETY: esp_timer_get_time is a free-running counter read.
    let start = unsafe { esp_timer_get_time() };
    loop {
        let now = unsafe { esp_timer_get_time() };
        if gpio_read(pin) != level {
            return Ok(now - start);
        }
        if now - start > timeout_us {
            return Err(SensorError::NoResponse);
        }
    }
}

/// Read one frame from the DHT22 on `pin`.
///
/// The 40-bit transfer takes about 5 ms and runs with interrupts masked on
/// the calling core so bit timing is not stretched by preemption.
#[cfg(target_os = "espidf")]
pub fn dht22_read(pin: i32) -> Result<(f32, f32), SensorError> {
    // Start signal: hold the bus low for at least 1 ms, then release.
    gpio_write(pin, false);
    // SAFETY: busy-wait ROM routine.
    unsafe { esp_rom_delay_us(1_100) };

    let frame = esp_idf_hal::interrupt::free(|| -> Result<[u8; 5], SensorError> {
        gpio_write(pin, true);
        // Released high, then the probe answers 80 µs low + 80 µs high.
        wait_while_level(pin, true, 60)?;
        wait_while_level(pin, false, 100)?;
        wait_while_level(pin, true, 100)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            wait_while_level(pin, false, 70)?;
            // 26-28 µs high = 0, 70 µs high = 1.
            let high_us = wait_while_level(pin, true, 100)?;
            if high_us > 40 {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    })?;

    decode_dht22_frame(&frame)
}

#[cfg(not(target_os = "espidf"))]
pub fn dht22_read(_pin: i32) -> Result<(f32, f32), SensorError> {
    let state = sim::DHT.load(core::sync::atomic::Ordering::Relaxed);
    if state & sim::DHT_NO_RESPONSE != 0 {
        return Err(SensorError::NoResponse);
    }
    sim::DHT_READS.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
    let b = state.to_be_bytes();
    decode_dht22_frame(&[b[3], b[4], b[5], b[6], b[7]])
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};

    /// One bit per GPIO; everything idles high (pull-ups).
    pub static GPIO_LEVELS: AtomicU64 = AtomicU64::new(u64::MAX);
    pub static ADC: [AtomicU16; 10] = [const { AtomicU16::new(0) }; 10];
    pub const DHT_NO_RESPONSE: u64 = 1 << 63;
    /// Low five bytes hold the DHT22 frame, bit 63 flags a silent probe.
    /// Silent until a test configures a reading.
    pub static DHT: AtomicU64 = AtomicU64::new(DHT_NO_RESPONSE);
    pub static DHT_READS: AtomicU32 = AtomicU32::new(0);

    pub fn set_gpio(pin: i32, high: bool) {
        let mask = 1u64 << pin;
        if high {
            GPIO_LEVELS.fetch_or(mask, Ordering::Relaxed);
        } else {
            GPIO_LEVELS.fetch_and(!mask, Ordering::Relaxed);
        }
    }
}

/// Drive a simulated input line.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_gpio(pin: i32, high: bool) {
    sim::set_gpio(pin, high);
}

/// Set the simulated ADC1 code on `channel`.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(channel: u32, code: u16) {
    if let Some(a) = sim::ADC.get(channel as usize) {
        a.store(code, core::sync::atomic::Ordering::Relaxed);
    }
}

/// Make the simulated DHT22 report the given reading.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_dht22(temperature_c: f32, humidity_pct: f32) {
    sim_set_dht22_frame(encode_dht22_frame(temperature_c, humidity_pct));
}

/// Load a raw (possibly corrupt) frame into the simulated DHT22.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_dht22_frame(frame: [u8; 5]) {
    let mut b = [0u8; 8];
    b[3..].copy_from_slice(&frame);
    sim::DHT.store(u64::from_be_bytes(b), core::sync::atomic::Ordering::Relaxed);
}

/// Make the simulated DHT22 stop answering.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_dht22_silent() {
    sim::DHT.store(sim::DHT_NO_RESPONSE, core::sync::atomic::Ordering::Relaxed);
}

/// Number of successful simulated DHT22 bus transactions.
#[cfg(not(target_os = "espidf"))]
pub fn sim_dht22_reads() -> u32 {
    sim::DHT_READS.load(core::sync::atomic::Ordering::Relaxed)
}
