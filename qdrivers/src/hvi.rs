//! Driver for the Keysight HVI sequencer, the hardware timeline that coordinates SD1 modules

use crate::{
    core::{
        param,
        ParameterInfo,
    },
    error::{
        Error,
        Result,
    },
};
use sd1::{
    Hvi,
    Slot,
};
use std::path::Path;
use tracing::{
    debug,
    info,
    warn,
};

pub const PARAMETERS: &[ParameterInfo] = &[param!(
    "open",
    "open",
    "",
    Hardware,
    Get,
    "Indicating if device is open, True (open) or False (closed)"
)];

/// An HVI sequencer bound to the hardware at one slot
#[derive(Debug)]
pub struct Sequencer<T> {
    name: String,
    index: i32,
    slot: Slot,
    sdk: T,
}

impl<T> Sequencer<T>
where
    T: Hvi,
{
    /// Bind HVI hardware index `index` to the module at `slot`
    /// # Errors
    /// Returns an error if the SDK refuses the assignment
    pub fn assign(name: impl Into<String>, mut sdk: T, slot: Slot, index: i32) -> Result<Self> {
        let name = name.into();
        let code = match sdk.assign_hardware_with_index_and_slot(index, slot) {
            Ok(code) => code,
            Err(e) => e.code().unwrap_or_default(),
        };
        if code <= 0 {
            return Err(Error::Open { slot, code });
        }
        info!(%name, index, %slot, "Assigned HVI hardware");
        Ok(Self {
            name,
            index,
            slot,
            sdk,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn index(&self) -> i32 {
        self.index
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// The underlying SDK handle
    #[must_use]
    pub fn sdk(&self) -> &T {
        &self.sdk
    }

    /// Whether a sequence file is open
    /// # Errors
    /// Returns an error on SDK failures
    pub fn is_open(&mut self) -> Result<bool> {
        Ok(self.sdk.is_open()?)
    }

    /// Open an HVI sequence file
    /// # Errors
    /// Returns an error on SDK failures
    pub fn open(&mut self, file: impl AsRef<Path>) -> Result<()> {
        let file = file.as_ref();
        self.sdk.open(file)?;
        debug!(file = %file.display(), "Opened HVI file");
        Ok(())
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn close(&mut self) -> Result<()> {
        Ok(self.sdk.close()?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn start(&mut self) -> Result<()> {
        Ok(self.sdk.start()?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn pause(&mut self) -> Result<()> {
        Ok(self.sdk.pause()?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn resume(&mut self) -> Result<()> {
        Ok(self.sdk.resume()?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn stop(&mut self) -> Result<()> {
        Ok(self.sdk.stop()?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn reset(&mut self) -> Result<()> {
        Ok(self.sdk.reset()?)
    }

    /// Compile the open sequence, returning the number of compilation errors
    /// # Errors
    /// Returns an error on SDK failures
    pub fn compile(&mut self) -> Result<usize> {
        let errors = self.sdk.compile()?;
        if errors > 0 {
            warn!(errors, "HVI compilation failed");
        }
        Ok(errors)
    }

    /// The message of compilation error `index`
    /// # Errors
    /// Returns an error on SDK failures or a bad index
    pub fn compilation_error_message(&mut self, index: usize) -> Result<String> {
        Ok(self.sdk.compilation_error_message(index)?)
    }

    /// Load the compiled sequence onto the hardware
    /// # Errors
    /// Returns an error on SDK failures
    pub fn load(&mut self) -> Result<()> {
        Ok(self.sdk.load()?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn number_of_modules(&mut self) -> Result<usize> {
        Ok(self.sdk.number_of_modules()?)
    }

    /// # Errors
    /// Returns an error on SDK failures or a bad index
    pub fn module_name(&mut self, index: usize) -> Result<String> {
        Ok(self.sdk.module_name(index)?)
    }

    /// # Errors
    /// Returns an error on SDK failures or an unknown module
    pub fn module_index(&mut self, name: &str) -> Result<usize> {
        Ok(self.sdk.module_index(name)?)
    }

    /// Write the integer constant `constant` of `module`
    /// # Errors
    /// Returns an error on SDK failures
    pub fn write_constant_int(&mut self, module: &str, constant: &str, value: i32) -> Result<()> {
        self.sdk.write_integer_constant(module, constant, value)?;
        debug!(module, constant, value, "Wrote HVI constant");
        Ok(())
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn read_constant_int(&mut self, module: &str, constant: &str) -> Result<i32> {
        Ok(self.sdk.read_integer_constant(module, constant)?)
    }

    /// Write the floating point constant `constant` of `module`, expressed in `unit`
    /// # Errors
    /// Returns an error on SDK failures
    pub fn write_constant_double(
        &mut self,
        module: &str,
        constant: &str,
        value: f64,
        unit: &str,
    ) -> Result<()> {
        self.sdk
            .write_double_constant(module, constant, value, unit)?;
        debug!(module, constant, value, unit, "Wrote HVI constant");
        Ok(())
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn read_constant_double(&mut self, module: &str, constant: &str) -> Result<f64> {
        Ok(self.sdk.read_double_constant(module, constant)?)
    }

    /// # Errors
    /// Always, the SDK has no register access for HVI
    pub fn write_register(&mut self, _register: &str, _value: i32) -> Result<()> {
        Err(Error::Unsupported("HVI register writes"))
    }

    /// # Errors
    /// Always, the SDK has no register access for HVI
    pub fn read_register(&mut self, _register: &str) -> Result<i32> {
        Err(Error::Unsupported("HVI register reads"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd1::mock::{
        HviState,
        MockHvi,
    };

    fn sequencer() -> Sequencer<MockHvi> {
        Sequencer::assign("hvi", MockHvi::new(["DIG0", "AWG0"]), Slot::new(0, 2), 0).unwrap()
    }

    #[test]
    fn test_assign_refused() {
        for status in [0, -8000] {
            let err = Sequencer::assign(
                "hvi",
                MockHvi::new(["DIG0"]).with_assign_status(status),
                Slot::new(0, 2),
                0,
            )
            .unwrap_err();
            assert!(matches!(err, Error::Open { code, .. } if code == status));
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut hvi = sequencer();
        assert!(!hvi.is_open().unwrap());
        hvi.open("sequence.HVI").unwrap();
        assert!(hvi.is_open().unwrap());
        assert_eq!(hvi.compile().unwrap(), 0);
        hvi.load().unwrap();
        hvi.start().unwrap();
        hvi.pause().unwrap();
        assert_eq!(hvi.sdk().state(), HviState::Paused);
        hvi.resume().unwrap();
        hvi.stop().unwrap();
        hvi.reset().unwrap();
        assert_eq!(hvi.sdk().state(), HviState::Idle);
        hvi.close().unwrap();
        assert!(!hvi.is_open().unwrap());
    }

    #[test]
    fn test_start_before_load() {
        let mut hvi = sequencer();
        hvi.open("sequence.HVI").unwrap();
        assert!(matches!(hvi.start(), Err(Error::Sdk(_))));
    }

    #[test]
    fn test_compile_errors() {
        let mut hvi = Sequencer::assign(
            "hvi",
            MockHvi::new(["DIG0"]).with_compile_errors(["missing wait", "bad jump"]),
            Slot::new(0, 2),
            0,
        )
        .unwrap();
        hvi.open("sequence.HVI").unwrap();
        assert_eq!(hvi.compile().unwrap(), 2);
        assert_eq!(hvi.compilation_error_message(1).unwrap(), "bad jump");
        assert!(hvi.load().is_err());
    }

    #[test]
    fn test_modules() {
        let mut hvi = sequencer();
        assert_eq!(hvi.number_of_modules().unwrap(), 2);
        assert_eq!(hvi.module_name(1).unwrap(), "AWG0");
        assert_eq!(hvi.module_index("AWG0").unwrap(), 1);
        assert!(hvi.module_index("AWG7").is_err());
    }

    #[test]
    fn test_constants() {
        let mut hvi = sequencer();
        hvi.write_constant_int("DIG0", "n_rep", 12).unwrap();
        hvi.write_constant_double("AWG0", "wait", 1.5e-6, "s").unwrap();
        assert_eq!(hvi.read_constant_int("DIG0", "n_rep").unwrap(), 12);
        assert!((hvi.read_constant_double("AWG0", "wait").unwrap() - 1.5e-6).abs() < 1e-15);
    }

    #[test]
    fn test_registers_unsupported() {
        let mut hvi = sequencer();
        assert!(matches!(
            hvi.write_register("r0", 1),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(hvi.read_register("r0"), Err(Error::Unsupported(_))));
    }
}
