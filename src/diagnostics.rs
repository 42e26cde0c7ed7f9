//! Runtime health metrics.
//!
//! Heap, uptime and Wi-Fi station figures sampled once per acquisition
//! cycle and published into the store's health region. On the host the
//! figures are synthetic but move over time, so the same formatting and
//! publishing paths run in simulation.

use core::net::Ipv4Addr;

/// Health figures at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemHealth {
    pub free_heap: u32,
    pub min_free_heap: u32,
    /// 0 = one contiguous free block, 100 = fully fragmented.
    pub fragmentation_pct: u8,
    pub uptime_secs: u64,
    /// 0 when not associated.
    pub wifi_rssi: i8,
    /// `0.0.0.0` when the station has no address.
    pub ip_address: Ipv4Addr,
}

impl Default for SystemHealth {
    fn default() -> Self {
        Self {
            free_heap: 0,
            min_free_heap: 0,
            fragmentation_pct: 0,
            uptime_secs: 0,
            wifi_rssi: 0,
            ip_address: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// Share of free heap that is *not* in the largest free block.
pub fn fragmentation_pct(free: u32, largest_block: u32) -> u8 {
    if free == 0 {
        return 0;
    }
    let contiguous = (u64::from(largest_block.min(free)) * 100) / u64::from(free);
    (100 - contiguous) as u8
}

#[derive(Default)]
pub struct HealthMonitor;

impl HealthMonitor {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "espidf")]
    pub fn collect(&mut self, uptime_ms: u64) -> SystemHealth {
        use esp_idf_svc::sys::*;
        // SAFETY: heap statistics getters take the heap lock internally.
        let (free, min_free, largest) = unsafe {
            (
                esp_get_free_heap_size(),
                esp_get_minimum_free_heap_size(),
                heap_caps_get_largest_free_block(MALLOC_CAP_8BIT) as u32,
            )
        };

        SystemHealth {
            free_heap: free,
            min_free_heap: min_free,
            fragmentation_pct: fragmentation_pct(free, largest),
            uptime_secs: uptime_ms / 1000,
            wifi_rssi: Self::read_wifi_rssi(),
            ip_address: Self::read_station_ip(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_wifi_rssi() -> i8 {
        use esp_idf_svc::sys::*;
        // SAFETY: zeroed POD out-parameter for the IDF getter.
        let mut ap_info: wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_wifi_sta_get_ap_info(&mut ap_info) };
        if ret == ESP_OK as i32 { ap_info.rssi } else { 0 }
    }

    #[cfg(target_os = "espidf")]
    fn read_station_ip() -> Ipv4Addr {
        use esp_idf_svc::sys::*;
        // SAFETY: the key is a static C string; a null handle is checked
        // before use and `ip_info` is a zeroed POD out-parameter.
        unsafe {
            let netif = esp_netif_get_handle_from_ifkey(c"WIFI_STA_DEF".as_ptr());
            if netif.is_null() {
                return Ipv4Addr::UNSPECIFIED;
            }
            let mut ip_info: esp_netif_ip_info_t = core::mem::zeroed();
            if esp_netif_get_ip_info(netif, &mut ip_info) != ESP_OK as i32 {
                return Ipv4Addr::UNSPECIFIED;
            }
            // lwIP keeps the address in network order.
            Ipv4Addr::from(ip_info.ip.addr.to_le_bytes())
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect(&mut self, uptime_ms: u64) -> SystemHealth {
        let uptime_secs = uptime_ms / 1000;
        // Heap "decays" slightly over time to model fragmentation.
        let base_free: u32 = 180_000;
        let decay = (uptime_secs / 60) as u32 * 256;
        let free_heap = base_free.saturating_sub(decay);
        let largest = free_heap - free_heap / 10;

        SystemHealth {
            free_heap,
            min_free_heap: free_heap - free_heap / 8,
            fragmentation_pct: fragmentation_pct(free_heap, largest),
            uptime_secs,
            wifi_rssi: -62,
            ip_address: Ipv4Addr::new(192, 168, 4, 1),
        }
    }
}
