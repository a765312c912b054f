//! SSD1306 OLED readout.

use display_interface::DisplayError;
use ssd1306::Ssd1306;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;

use airq_core::display::{Readout, ReadoutLines, ReadoutScreen};

/// Buffered OLED panel plus the shared line renderer.
///
/// The flush over blocking I2C stalls the loop for a few milliseconds,
/// which the once-per-cycle cadence absorbs without an async driver.
pub struct OledReadout<DI, SIZE>
where
    DI: WriteOnlyDataCommand,
    SIZE: DisplaySize,
{
    display: Ssd1306<DI, SIZE, BufferedGraphicsMode<SIZE>>,
    screen: ReadoutScreen,
}

impl<DI, SIZE> OledReadout<DI, SIZE>
where
    DI: WriteOnlyDataCommand,
    SIZE: DisplaySize,
{
    pub fn new(display: Ssd1306<DI, SIZE, BufferedGraphicsMode<SIZE>>, screen: ReadoutScreen) -> Self {
        Self { display, screen }
    }
}

impl<DI, SIZE> Readout for OledReadout<DI, SIZE>
where
    DI: WriteOnlyDataCommand,
    SIZE: DisplaySize,
{
    type Error = DisplayError;

    async fn show(&mut self, lines: &ReadoutLines) -> Result<(), DisplayError> {
        self.screen
            .draw(lines, &mut self.display)
            .map_err(|_| DisplayError::OutOfBoundsError)?;
        self.display.flush()
    }
}
