//! Typed wrappers for built-in effect units.
//!
//! Each wrapper is a [`Dsp`](crate::dsp::Dsp) whose engine type has been
//! checked, with its parameter indices named in a `param` module and
//! accessors that pick the right parameter shape:
//!
//! - [`MultibandEq`] - five independent filter bands
//! - [`ThreeEq`] - low/mid/high gains with two crossovers
//! - [`Compressor`] - downward compressor with makeup gain
//! - [`Chorus`] - modulated delay
//!
//! ```rust
//! use std::sync::Arc;
//! use sonance_core::effects::EqFilter;
//! use sonance_core::mock::MockEngine;
//! use sonance_core::System;
//!
//! let system = System::builder(Arc::new(MockEngine::new())).build()?;
//! let eq = system.create_multiband_eq()?;
//! eq.set_filter(1, EqFilter::Peaking)?;
//! eq.set_frequency(1, 2_500.0)?;
//! eq.set_gain(1, -6.0)?;
//! assert_eq!(eq.filter(1)?, EqFilter::Peaking);
//! assert!(eq.set_gain(5, 0.0).is_err());
//! # Ok::<(), sonance_core::Error>(())
//! ```

pub mod chorus;
pub mod compressor;
pub mod multiband_eq;
pub mod three_eq;

pub use chorus::Chorus;
pub use compressor::Compressor;
pub use multiband_eq::{EqFilter, MultibandEq, NUM_BANDS};
pub use three_eq::{CrossoverSlope, ThreeEq};
