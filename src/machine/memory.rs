//! LEAP16 memory subsystem.
//!
//! A flat array of 65536 sixteen-bit words addressed 0x0000 to 0xFFFF.
//! Program, data and stack all live here with no protection between them.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of words in LEAP16 memory.
pub const MEMORY_SIZE: usize = 0x10000;

/// LEAP16 memory: 64Ki sixteen-bit words.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u16>", into = "Vec<u16>")]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a word. Every 16-bit address is valid.
    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// The whole address space as a slice.
    pub fn as_slice(&self) -> &[u16] {
        &self.cells
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program image to address 0x0000.
    ///
    /// The image is checked before any word is written, so an oversize
    /// image leaves memory exactly as it was.
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), LoadError> {
        if program.len() > MEMORY_SIZE {
            return Err(LoadError::ProgramTooLarge {
                size: program.len(),
                capacity: MEMORY_SIZE,
            });
        }

        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Words from `start` to the end of the address space.
    pub fn tail(&self, start: u16) -> &[u16] {
        &self.cells[start as usize..]
    }

    /// Dump `count` words starting at `start`, clamped to the address space.
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u16)> {
        let end = (start as usize + count).min(MEMORY_SIZE);
        (start as usize..end)
            .map(|i| (i as u16, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<u16>> for Memory {
    type Error = LoadError;

    fn try_from(cells: Vec<u16>) -> Result<Self, Self::Error> {
        if cells.len() != MEMORY_SIZE {
            return Err(LoadError::WrongSize {
                size: cells.len(),
                capacity: MEMORY_SIZE,
            });
        }
        Ok(Self { cells })
    }
}

impl From<Memory> for Vec<u16> {
    fn from(memory: Memory) -> Self {
        memory.cells
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur when placing words into memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("program size {size} exceeds memory size {capacity}")]
    ProgramTooLarge { size: usize, capacity: usize },

    #[error("memory image has {size} words, expected {capacity}")]
    WrongSize { size: usize, capacity: usize },
}
