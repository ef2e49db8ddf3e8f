//! Bus transports: the narrow command/data path to the display controller.
//
// The refresh scheduler only ever needs five things from the outside world:
// command bytes, data bytes (single and bulk), and a begin/end bracket around
// sequences that must reach the controller back-to-back. Two wrappers cover
// the panels this crate targets: 4-wire SPI with a D/C pin, and I2C with a
// control-byte prefix per payload byte. Neither contains any drawing logic.

use core::fmt;

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

/// Write-only command/data bus to the controller.
///
/// All calls are blocking and best-effort: the wire has no acknowledgment
/// channel, so errors surface only when the underlying peripheral reports
/// one. Begin/end pairs must not be nested.
pub trait DisplayBus {
    type Error;

    /// Start a sequence that must appear atomic to the controller.
    fn begin_transaction(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Close the bracket opened by [`begin_transaction`](Self::begin_transaction).
    fn end_transaction(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn send_command(&mut self, cmd: u8) -> Result<(), Self::Error>;

    fn send_data(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.send_data_bulk(&[byte])
    }

    fn send_data_bulk(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Error type that wraps SPI and GPIO errors.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiBusError<SpiE, GpioE> {
    Spi(SpiE),
    Gpio(GpioE),
}

impl<SpiE: fmt::Debug, GpioE: fmt::Debug> fmt::Display for SpiBusError<SpiE, GpioE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "spi: {e:?}"),
            Self::Gpio(e) => write!(f, "gpio: {e:?}"),
        }
    }
}

/// 4-wire SPI transport: D/C low selects commands, high selects data.
///
/// CS framing belongs to the `SpiDevice` implementation (e.g.
/// `embedded_hal_bus::spi::ExclusiveDevice`), so every write here is already
/// an atomic CS-asserted transfer and the transaction bracket is a no-op.
pub struct SpiBus<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> SpiBus<SPI, DC>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self { spi, dc }
    }

    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }
}

impl<SPI, DC> DisplayBus for SpiBus<SPI, DC>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    type Error = SpiBusError<SPI::Error, DC::Error>;

    fn send_command(&mut self, cmd: u8) -> Result<(), Self::Error> {
        self.dc.set_low().map_err(SpiBusError::Gpio)?;
        self.spi.write(&[cmd]).map_err(SpiBusError::Spi)
    }

    fn send_data_bulk(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(SpiBusError::Gpio)?;
        self.spi.write(data).map_err(SpiBusError::Spi)
    }
}

/// Control byte announcing a command byte on the I2C framing.
pub const I2C_CTRL_COMMAND: u8 = 0x00;
/// Control byte announcing a data byte on the I2C framing.
pub const I2C_CTRL_DATA: u8 = 0x40;

// Payload bytes per I2C transfer; control-byte pairing doubles it on the wire.
const I2C_CHUNK: usize = 32;

/// I2C transport for controllers that want a control byte in front of every
/// payload byte (IST3931-style framing).
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cBus<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> DisplayBus for I2cBus<I2C> {
    type Error = I2C::Error;

    fn send_command(&mut self, cmd: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[I2C_CTRL_COMMAND, cmd])
    }

    fn send_data_bulk(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for chunk in data.chunks(I2C_CHUNK) {
            let mut staged: heapless::Vec<u8, { I2C_CHUNK * 2 }> = heapless::Vec::new();
            for &b in chunk {
                staged.push(I2C_CTRL_DATA).ok();
                staged.push(b).ok();
            }
            self.i2c.write(self.address, &staged)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::convert::Infallible;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum WireEv {
        DcLow,
        DcHigh,
        SpiWrite(Vec<u8>),
        I2cWrite(u8, Vec<u8>),
    }

    type Log = Rc<RefCell<Vec<WireEv>>>;

    struct FakeSpi(Log);

    impl embedded_hal::spi::ErrorType for FakeSpi {
        type Error = Infallible;
    }

    impl SpiDevice<u8> for FakeSpi {
        fn transaction(
            &mut self,
            operations: &mut [embedded_hal::spi::Operation<'_, u8>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                if let embedded_hal::spi::Operation::Write(bytes) = op {
                    self.0.borrow_mut().push(WireEv::SpiWrite(bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    struct FakeDc(Log);

    impl embedded_hal::digital::ErrorType for FakeDc {
        type Error = Infallible;
    }

    impl OutputPin for FakeDc {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(WireEv::DcLow);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(WireEv::DcHigh);
            Ok(())
        }
    }

    struct FakeI2c(Log);

    impl embedded_hal::i2c::ErrorType for FakeI2c {
        type Error = Infallible;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [embedded_hal::i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                if let embedded_hal::i2c::Operation::Write(bytes) = op {
                    self.0
                        .borrow_mut()
                        .push(WireEv::I2cWrite(address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn spi_frames_commands_and_data_with_the_dc_pin() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = SpiBus::new(FakeSpi(log.clone()), FakeDc(log.clone()));
        bus.send_command(0xB0).unwrap();
        bus.send_data_bulk(&[1, 2, 3]).unwrap();
        bus.send_data(9).unwrap();
        bus.send_data_bulk(&[]).unwrap(); // no traffic
        assert_eq!(
            log.borrow().as_slice(),
            &[
                WireEv::DcLow,
                WireEv::SpiWrite(alloc::vec![0xB0]),
                WireEv::DcHigh,
                WireEv::SpiWrite(alloc::vec![1, 2, 3]),
                WireEv::DcHigh,
                WireEv::SpiWrite(alloc::vec![9]),
            ]
        );
    }

    #[test]
    fn i2c_prefixes_every_byte_with_a_control_byte() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = I2cBus::new(FakeI2c(log.clone()), 0x3F);
        bus.send_command(0xAF).unwrap();
        bus.send_data_bulk(&[0x12, 0x34]).unwrap();
        assert_eq!(
            log.borrow().as_slice(),
            &[
                WireEv::I2cWrite(0x3F, alloc::vec![I2C_CTRL_COMMAND, 0xAF]),
                WireEv::I2cWrite(0x3F, alloc::vec![I2C_CTRL_DATA, 0x12, I2C_CTRL_DATA, 0x34]),
            ]
        );
    }

    #[test]
    fn i2c_chunks_long_runs() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = I2cBus::new(FakeI2c(log.clone()), 0x3F);
        let data = [0xA5u8; 70];
        bus.send_data_bulk(&data).unwrap();
        let log = log.borrow();
        assert_eq!(log.len(), 3); // 32 + 32 + 6 payload bytes
        for (i, ev) in log.iter().enumerate() {
            let WireEv::I2cWrite(addr, bytes) = ev else {
                panic!("unexpected event");
            };
            assert_eq!(*addr, 0x3F);
            let want_payload = if i < 2 { 32 } else { 6 };
            assert_eq!(bytes.len(), want_payload * 2);
            for pair in bytes.chunks(2) {
                assert_eq!(pair, &[I2C_CTRL_DATA, 0xA5]);
            }
        }
    }
}
