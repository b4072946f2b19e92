pub mod config;
pub mod console_display;
pub mod coordinator;
pub mod data_logger;
pub mod devices;
pub mod diagnostics;
pub mod engine;
pub mod generator;
pub mod motion;
pub mod playback;
pub mod scale;
pub mod session_reader;
pub mod simulator;
pub mod types;
pub mod visualizer;

#[cfg(feature = "hardware")]
pub mod serial_sensor;

#[cfg(feature = "audio")]
pub mod audio_tone;
