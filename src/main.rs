//! LeakGuard Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BoardPins        LogDisplay     LogAlarm/LogTones  StdFs      │
//! │  (GPIO)           (DisplayPort)  (Sound ports)      (FilePort) │
//! │  JsonConfigFile   LogEventSink   SystemClock                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            LeakController (domain logic)               │    │
//! │  │  StateStore · WaterLineValves · LeakGuard              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  runtime: LocalExecutor loops + COMMANDS channel               │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use log::{error, info, warn};

use leakguard::adapters::config_file::JsonConfigFile;
use leakguard::adapters::console::{LogAlarm, LogDisplay, LogTones};
use leakguard::adapters::fs::StdFs;
use leakguard::adapters::log_sink::LogEventSink;
use leakguard::adapters::time::SystemClock;
use leakguard::app::ports::{ConfigPort, SharedDisplay};
use leakguard::app::service::LeakController;
use leakguard::config::SystemConfig;
use leakguard::runtime::{self, CancelToken};

#[cfg(target_os = "espidf")]
const DATA_ROOT: &str = "/spiffs";
#[cfg(not(target_os = "espidf"))]
const DATA_ROOT: &str = "data";

const CONFIG_FILE: &str = "config.json";

fn main() -> Result<()> {
    // ── 1. Bootstrap + logging ────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
        mount_data_partition()?;
    }
    #[cfg(not(target_os = "espidf"))]
    leakguard::adapters::console_log::init(log::LevelFilter::Info);

    info!("╔══════════════════════════════════════╗");
    info!("║  LeakGuard v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let data_root = std::env::var("LEAKGUARD_DATA").unwrap_or_else(|_| DATA_ROOT.to_string());
    let config_port = JsonConfigFile::new(std::path::Path::new(&data_root).join(CONFIG_FILE));
    let config = config_port.load().unwrap_or_else(|e| {
        warn!("APP: config unusable ({}), using defaults", e);
        SystemConfig::default()
    });
    log::set_max_level(config.log_level_filter());

    // ── 3. Board + adapters ───────────────────────────────────
    #[cfg(target_os = "espidf")]
    let board = leakguard::drivers::board::take_board()?;
    #[cfg(not(target_os = "espidf"))]
    let board = {
        let (board, sim) = leakguard::drivers::board::simulated();
        spawn_console(sim)?;
        board
    };

    let display: SharedDisplay = Rc::new(RefCell::new(LogDisplay::new()));
    let controller = LeakController::from_board(
        &config,
        board,
        Box::new(SystemClock::new()),
        display,
        Box::new(LogAlarm::default()),
        Box::new(LogTones),
    );

    // ── 4. Run until shutdown ─────────────────────────────────
    let fs = StdFs::new(&data_root);
    match runtime::run(controller, fs, LogEventSink::new(), &config, CancelToken::new()) {
        Ok(outcome) => info!("APP: stopped cleanly ({:?})", outcome),
        Err(e) => error!("APP: final flush failed: {}", e),
    }
    Ok(())
}

/// Read console commands on a helper thread and feed the control thread.
#[cfg(not(target_os = "espidf"))]
fn spawn_console(sim: leakguard::drivers::board::SimHandles) -> Result<()> {
    use std::io::BufRead;

    use leakguard::adapters::console_input::{self, ConsoleInput, HELP};
    use leakguard::app::commands::AppCommand;

    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            info!("APP: console ready ({})", HELP);
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match console_input::parse(&line) {
                    Ok(ConsoleInput::Help) => info!("APP: {}", HELP),
                    Ok(input) => {
                        if let Some(cmd) = console_input::apply(input, &sim) {
                            runtime::submit(cmd);
                            if cmd == AppCommand::Shutdown {
                                break;
                            }
                        }
                    }
                    Err(e) => warn!("APP: '{}': {}", line.trim(), e),
                }
            }
        })?;
    Ok(())
}

#[cfg(target_os = "espidf")]
fn mount_data_partition() -> Result<()> {
    use esp_idf_svc::sys::{ESP_OK, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };
    // SAFETY: called once at boot, before any file access.
    let rc = unsafe { esp_vfs_spiffs_register(&conf) };
    if rc != ESP_OK as i32 {
        anyhow::bail!("SPIFFS mount failed (rc={})", rc);
    }
    info!("APP: data partition mounted at {}", DATA_ROOT);
    Ok(())
}
