//! Centralized logging for the device emulators.
//!
//! # Architecture
//!
//! - **LogConfig**: global configuration held in atomics, one level per category
//! - **LogLevel**: hierarchical levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: cartridge, RTC, Transfer Pak, boot, backends and stubs
//! - **log()**: single entry point; the message closure only runs when enabled
//!
//! Messages go to stderr, or to a log file written by a background thread so
//! file I/O never stalls the emulation thread. Each category is rate limited
//! with a one-second sliding window.
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Cart, LogLevel::Debug, || {
//!     format!("Cart: ROM bank -> {}", 5)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for the emulated devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Game Boy cartridge: controller detection, bank switching
    Cart,
    /// MBC3 real-time clock
    Rtc,
    /// Transfer Pak accessory window
    Pak,
    /// PIF boot ROM simulation and CIC detection
    Boot,
    /// Storage and clock backends
    Backend,
    /// Unknown registers and ignored accesses
    Stubs,
}

impl LogCategory {
    pub const ALL: [LogCategory; 6] = [
        LogCategory::Cart,
        LogCategory::Rtc,
        LogCategory::Pak,
        LogCategory::Boot,
        LogCategory::Backend,
        LogCategory::Stubs,
    ];

    const COUNT: usize = Self::ALL.len();

    fn index(self) -> usize {
        self as usize
    }

    /// Parse a category name as used in configuration files
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cart" | "cartridge" => Some(LogCategory::Cart),
            "rtc" => Some(LogCategory::Rtc),
            "pak" | "transfer_pak" => Some(LogCategory::Pak),
            "boot" => Some(LogCategory::Boot),
            "backend" => Some(LogCategory::Backend),
            "stubs" => Some(LogCategory::Stubs),
            _ => None,
        }
    }
}

/// Sliding-window rate limiter, one window per category
struct RateLimiter {
    max_per_second: AtomicUsize,
    window: Duration,
    state: Mutex<[WindowState; LogCategory::COUNT]>,
}

#[derive(Default)]
struct WindowState {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            window: Duration::from_secs(1),
            state: Mutex::new(Default::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, [WindowState; LogCategory::COUNT]> {
        // A panic while logging must not disable logging for everyone else
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns (allowed, dropped count to report)
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let max = self.max_per_second.load(Ordering::Relaxed);
        let mut state = self.lock();
        let window = &mut state[category.index()];

        while let Some(&front) = window.timestamps.front() {
            if now.duration_since(front) > self.window {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        if window.timestamps.len() < max {
            window.timestamps.push_back(now);
            if window.dropped > 0 {
                let dropped = std::mem::take(&mut window.dropped);
                window.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        window.dropped += 1;
        let report_due = window
            .last_drop_report
            .map_or(true, |last| now.duration_since(last) >= self.window);
        if report_due {
            let dropped = std::mem::take(&mut window.dropped);
            window.last_drop_report = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; LogCategory::COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All logging disabled, 60 messages per second per category
    pub(crate) fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category level other than `Off` overrides the global level
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        match self.get_level(category) {
            LogLevel::Off => level <= self.get_global_level(),
            category_level => level <= category_level,
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_logs_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    /// Route messages to `path` through a background writer thread
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        *self.sender() = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop logging to file; the writer thread exits once its channel closes
    pub fn clear_log_file(&self) {
        *self.sender() = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn sender(&self) -> MutexGuard<'_, Option<Sender<String>>> {
        self.log_sender.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_message(&self, message: String) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = self.sender().as_ref() {
                if let Err(failed) = sender.send(message) {
                    eprintln!("{}", failed.0);
                }
                return;
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a message with the specified category and level
///
/// `message_fn` is only called when the category/level is enabled and the
/// category is under its rate limit. When messages were dropped, a summary
/// line is emitted first.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&c| c > 0) {
        config.write_message(format!(
            "[{:?}] WARNING: Rate limit exceeded, {} log message(s) dropped in the last second",
            category, count
        ));
    }
    if allowed {
        config.write_message(message_fn());
    }
}
