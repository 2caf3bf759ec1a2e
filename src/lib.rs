//! Assembly of viscous (Stokes-type) constitutive operators with an incompressibility penalty.
//!
//! The central pieces are the Voigt-form [`ConstitutiveTensor`](constitutive::ConstitutiveTensor),
//! which maps strain rates to stresses at a single quadrature point, and the element assembly
//! routines in [`assembly::local`], which turn per-point viscosities into local element stiffness
//! matrices, optionally with a Newton linearization and an under-integrated penalty term.
//!
//! Geometry, quadrature, rheology and field interpolation enter through traits so that the
//! kernel can be driven by any mesh or material storage. Simple implementations of all of them
//! are provided in [`mesh`], [`quadrature`], [`rheology`] and [`interpolate`].
use nalgebra::{DimMin, DimName, RealField};

pub mod allocators;
pub mod assembly;
pub mod constitutive;
pub mod element;
pub mod interpolate;
pub mod mesh;
pub mod quadrature;
pub mod rheology;
pub mod space;
pub mod stress;
pub mod voigt;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;

pub use voigt::CartesianDim;

/// A small, fixed-size dimension.
///
/// Used as a trait alias for various traits frequently needed by generic routines.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}

/// Real scalar types supported by the assembly routines.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
