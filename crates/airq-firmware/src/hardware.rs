//! Hardware bring-up for the station.
//!
//! Every peripheral is constructed here, once, in the setup phase, and
//! handed to the loop as an explicit dependency. Nothing hardware-facing
//! lives in a module-level global.

use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;

/// Create the async I2C bus the sensors share.
pub fn create_sensor_i2c(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO8<'static>,
    scl: esp_hal::peripherals::GPIO9<'static>,
) -> I2c<'static, esp_hal::Async> {
    I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .unwrap()
    .with_sda(sda)
    .with_scl(scl)
    .into_async()
}

/// Create the blocking I2C bus for the OLED panel.
///
/// The panel sits on its own bus so its blocking flushes never contend
/// with an in-flight async sensor transaction.
pub fn create_display_i2c(
    i2c1: esp_hal::peripherals::I2C1<'static>,
    sda: esp_hal::peripherals::GPIO17<'static>,
    scl: esp_hal::peripherals::GPIO18<'static>,
) -> I2c<'static, esp_hal::Blocking> {
    I2c::new(
        i2c1,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sda(sda)
    .with_scl(scl)
}

/// Wrap an SPI device and delay into an SD card instance for the store.
pub fn init_sd_card<S, D>(sd_card_spi: S, delay: D) -> embedded_sdmmc::SdCard<S, D>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
{
    embedded_sdmmc::SdCard::new(sd_card_spi, delay)
}

/// The station has no RTC or network time; FAT directory entries all get
/// the same fixed date. Row timestamps come from the boot clock instead.
pub struct FixedTimeSource;

impl embedded_sdmmc::TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> embedded_sdmmc::Timestamp {
        embedded_sdmmc::Timestamp {
            year_since_1970: 55,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}
