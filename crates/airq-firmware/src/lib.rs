//! ESP32-S3 firmware-specific modules for airq-rs
//!
//! This crate contains hardware-specific code that cannot compile on
//! desktop targets: ESP32 peripheral initialization, the concrete sensor
//! bank on the shared I2C bus, the OLED readout, and the boot-relative
//! clock.

#![no_std]

extern crate alloc;

pub mod clock;
pub mod hardware;
pub mod readout;
pub mod sensor_bank;
