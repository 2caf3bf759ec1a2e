//! Strategies for generating viscous material data.
use crate::rheology::{AnisotropicViscosityParameters, ViscosityParameters};
use ::proptest::prelude::*;
use nalgebra::{Vector2, Vector3, U2, U3};

/// Positive viscosities spanning several orders of magnitude.
pub fn viscosity() -> impl Strategy<Value = f64> {
    (-3.0..3.0f64).prop_map(|exponent| 10f64.powf(exponent))
}

pub fn unit_director2() -> impl Strategy<Value = Vector2<f64>> {
    (0.0..std::f64::consts::TAU).prop_map(|angle| Vector2::new(angle.cos(), angle.sin()))
}

pub fn unit_director3() -> impl Strategy<Value = Vector3<f64>> {
    // Uniform on the sphere
    (0.0..std::f64::consts::TAU, -1.0..=1.0f64).prop_map(|(phi, z)| {
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vector3::new(r * phi.cos(), r * phi.sin(), z)
    })
}

pub fn viscosity_parameters() -> impl Strategy<Value = ViscosityParameters<f64>> {
    viscosity().prop_map(|viscosity| ViscosityParameters { viscosity })
}

pub fn anisotropic_parameters2() -> impl Strategy<Value = AnisotropicViscosityParameters<f64, U2>> {
    (viscosity(), viscosity(), unit_director2()).prop_map(|(viscosity, second_viscosity, director)| {
        AnisotropicViscosityParameters {
            viscosity,
            second_viscosity,
            director,
        }
    })
}

pub fn anisotropic_parameters3() -> impl Strategy<Value = AnisotropicViscosityParameters<f64, U3>> {
    (viscosity(), viscosity(), unit_director3()).prop_map(|(viscosity, second_viscosity, director)| {
        AnisotropicViscosityParameters {
            viscosity,
            second_viscosity,
            director,
        }
    })
}
