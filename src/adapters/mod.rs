//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to               |
//! |-------------|-------------------|---------------------------|
//! | `console`   | -                 | Console UART line input   |
//! | `hardware`  | PinPort, DelayNs  | ESP32 GPIO, ROM delay     |
//! | `host_link` | ReturnChannel     | Outbound JSON frames      |
//! | `log_sink`  | ReturnChannel     | Serial log output, tap    |
//! | `time`      | -                 | ESP32 system timer        |

pub mod console;
pub mod hardware;
pub mod host_link;
pub mod log_sink;
pub mod time;
