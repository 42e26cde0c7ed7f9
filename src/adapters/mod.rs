//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements          | Connects to               |
//! |------------------|---------------------|---------------------------|
//! | `hardware`       | SoilProbePort       | ESP32 ADC1, GPIO, DHT22   |
//! |                  | IrrigationActuator  | relay + indicator GPIO    |
//! |                  | SystemProbe         | heap / Wi-Fi / netif      |
//! | `log_sink`       | EventSink           | Serial log output         |
//! | `telemetry_sink` | TelemetrySink       | Serial capture line       |
//! | `time`           | Clock               | ESP32 system timer        |

pub mod hardware;
pub mod log_sink;
pub mod telemetry_sink;
pub mod time;
