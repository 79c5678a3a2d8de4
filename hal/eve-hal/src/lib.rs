//! EVE Hardware Abstraction Layer
//!
//! This crate defines the few hardware services the EVE protocol engine
//! consumes. Everything chip-specific (SPI peripheral setup, pin muxing,
//! clock trees) lives behind these traits so the protocol logic can run
//! against real hardware or a simulated co-processor unchanged.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (eve-screens, firmware)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  eve-drivers (protocol engine)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  eve-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ embedded-hal  │       │  simulated    │
//! │ SPI + pins    │       │  co-processor │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`spi::Transport`] - Full-duplex single-byte exchange
//! - [`gpio::ChipSelect`] - Transaction framing line
//! - [`gpio::PowerDown`] - Reset / power-down line
//! - [`gpio::OutputPin`] - Plain digital output used by the adapters

#![no_std]
#![deny(unsafe_code)]

pub mod eh;
pub mod gpio;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use gpio::{ActiveLow, ChipSelect, OutputPin, PowerDown};
pub use spi::{SpiConfig, Transport};
