//! Sonance Analysis - spectrum presentation tools
//!
//! Turns the linear spectra read from an engine FFT unit into views suited
//! for display:
//!
//! - [`log_spectrum`] - log-frequency rebinning with peak-preserving bands
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sonance_analysis::LogRebinner;
//! use sonance_core::mock::MockEngine;
//! use sonance_core::System;
//!
//! let engine = Arc::new(MockEngine::new());
//! let system = System::builder(engine.clone()).build()?;
//! let fft = system.create_fft()?;
//! engine.set_spectrum(fft.raw(), &[&[0.0, 0.0, 1.0, 0.0]]);
//!
//! let rebinner = LogRebinner::from_fft(&fft, system.sample_rate()? as f32)?;
//! let view = rebinner.rebin_frame(&fft.spectrum()?);
//! assert_eq!(view.length(), 4);
//! # Ok::<(), sonance_core::Error>(())
//! ```

pub mod log_spectrum;

pub use log_spectrum::{LogRebinner, LogSpectrum, RESOLUTION_BREAKPOINTS};
