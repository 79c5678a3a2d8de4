//! Board-agnostic protocol model for FT81x EVE display co-processors
//!
//! This crate contains everything about the co-processor that does not
//! need a wire:
//!
//! - Memory map and register map
//! - Host (power / clock) commands
//! - Display-list instruction encoders
//! - Co-processor command encoder and decoder
//! - Command ring arithmetic
//! - Panel, backlight and polling configuration
//! - Touch data types

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod cmd;
pub mod config;
pub mod dl;
pub mod host;
pub mod memory;
pub mod registers;
pub mod ring;
pub mod touch;

pub use cmd::{Command, CommandSink};
pub use dl::{DlCmd, Primitive, Rgb};
pub use registers::{reg, Register, Width};
