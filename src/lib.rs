//! Lookup-table acceleration and maximum power point search for
//! photovoltaic simulation tools.
//!
//! The crate has two independent pieces: [`tables::bilinear::BilinearTable`],
//! a dense tabulated approximation of an expensive two-variable function
//! queried via bilinear interpolation, and [`algorithms::extremum`], a
//! bracket-narrowing maximizer for unimodal one-variable curves such as
//! photovoltaic power over voltage.
//!
//! ```
//! use pvlut::algorithms::extremum::bisect_max;
//! use pvlut::tables::bilinear::BilinearTable;
//!
//! let mut table = BilinearTable::new();
//! table.set_x_range(0.0, 10.0, 11);
//! table.set_y_range(0.0, 5.0, 6);
//! table.set_sampler(|x, y| x + y);
//! assert_eq!(table.interpolate(2.5, 1.5), Ok(4.0));
//!
//! let vmp = bisect_max(0.0, 20.0, 1e-6, |v: f64| v * (1.0 - v / 20.0));
//! assert!((vmp - 10.0).abs() < 1e-5);
//! ```
pub mod algorithms;
pub mod diagnostics;
pub mod errors;
pub mod storage;
pub mod tables;
