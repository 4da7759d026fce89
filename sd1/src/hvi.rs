//! The `SD_HVI` (hard virtual instrument sequencer) portion of the SD1 API

use crate::{
    Result,
    Slot,
};
use std::path::Path;

/// The set of SD1 HVI calls a driver needs
pub trait Hvi {
    /// Bind the HVI hardware slot `index` to the module at `slot`, returning a status (> 0 on
    /// success)
    fn assign_hardware_with_index_and_slot(&mut self, index: i32, slot: Slot) -> Result<i32>;

    /// Whether an HVI file is currently open
    fn is_open(&mut self) -> Result<bool>;

    /// Open an HVI project file
    fn open(&mut self, file: &Path) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn reset(&mut self) -> Result<()>;

    /// Compile the open project, returning the number of compilation errors
    fn compile(&mut self) -> Result<usize>;

    /// The message of compilation error `index`
    fn compilation_error_message(&mut self, index: usize) -> Result<String>;

    /// Load the compiled project to the hardware
    fn load(&mut self) -> Result<()>;

    fn number_of_modules(&mut self) -> Result<usize>;
    fn module_name(&mut self, index: usize) -> Result<String>;
    fn module_index(&mut self, name: &str) -> Result<usize>;

    fn write_integer_constant(&mut self, module: &str, constant: &str, value: i32) -> Result<()>;
    fn read_integer_constant(&mut self, module: &str, constant: &str) -> Result<i32>;
    fn write_double_constant(
        &mut self,
        module: &str,
        constant: &str,
        value: f64,
        unit: &str,
    ) -> Result<()>;
    fn read_double_constant(&mut self, module: &str, constant: &str) -> Result<f64>;
}
