//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `config_file`  | ConfigPort         | JSON file on the data volume|
//! | `console`      | DisplayPort        | Serial log (LCD stand-in)   |
//! |                | AlarmSoundPort     | Serial log (buzzer stand-in)|
//! |                | ControlSoundPort   |                             |
//! | `console_input`| (none)             | stdin commands, sim pins    |
//! | `console_log`  | log::Log           | stderr (host builds)        |
//! | `fs`           | FilePort           | `std::fs` under a root dir  |
//! | `log_sink`     | EventSink          | Serial log output           |
//! | `mem_fs`       | FilePort           | In-memory, fault injection  |
//! | `time`         | Clock              | ESP32 system timer / host   |

pub mod config_file;
pub mod console;
pub mod console_input;
pub mod console_log;
pub mod fs;
pub mod log_sink;
pub mod mem_fs;
pub mod time;
