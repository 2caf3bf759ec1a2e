use fenris_viscous::constitutive::ConstitutiveTensor;
use fenris_viscous::nalgebra::{Matrix2, Matrix3, Vector2, Vector3, U2, U3};
use fenris_viscous::proptest::viscosity_parameters;
use fenris_viscous::rheology::{
    AnisotropicViscosity, AnisotropicViscosityParameters, IsotropicViscosity, Rheology, ViscosityParameters,
};
use matrixcompare::assert_matrix_eq;
use proptest::prelude::*;

#[test]
fn isotropic_viscosity_rejects_invalid_values() {
    for viscosity in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let mut tensor = ConstitutiveTensor::<f64, U2>::zeros();
        let result = IsotropicViscosity.populate_constitutive_tensor(&mut tensor, &ViscosityParameters { viscosity });
        assert!(result.is_err(), "viscosity {} should be rejected", viscosity);
    }
}

#[test]
fn anisotropic_viscosity_rejects_zero_director() {
    let params = AnisotropicViscosityParameters::<f64, U3> {
        viscosity: 1.0,
        second_viscosity: 0.5,
        director: Vector3::zeros(),
    };
    let mut tensor = ConstitutiveTensor::<f64, U3>::zeros();
    assert!(AnisotropicViscosity
        .populate_constitutive_tensor(&mut tensor, &params)
        .is_err());
}

#[test]
fn anisotropic_viscosity_rejects_invalid_second_viscosity() {
    let params = AnisotropicViscosityParameters::<f64, U2> {
        viscosity: 1.0,
        second_viscosity: -0.5,
        director: Vector2::new(0.0, 1.0),
    };
    let mut tensor = ConstitutiveTensor::<f64, U2>::zeros();
    assert!(AnisotropicViscosity
        .populate_constitutive_tensor(&mut tensor, &params)
        .is_err());
}

#[test]
fn anisotropic_director_is_normalized() {
    let make_tensor = |director: Vector2<f64>| {
        let params = AnisotropicViscosityParameters {
            viscosity: 3.0,
            second_viscosity: 0.25,
            director,
        };
        let mut tensor = ConstitutiveTensor::<f64, U2>::zeros();
        AnisotropicViscosity
            .populate_constitutive_tensor(&mut tensor, &params)
            .unwrap();
        tensor
    };

    let unit = make_tensor(Vector2::new(0.6, 0.8));
    let scaled = make_tensor(Vector2::new(6.0, 8.0));
    assert_matrix_eq!(unit.matrix(), scaled.matrix(), comp = abs, tol = 1e-13);
}

#[test]
fn equal_viscosities_give_isotropic_tensor() {
    let params = AnisotropicViscosityParameters {
        viscosity: 2.0,
        second_viscosity: 2.0,
        director: Vector3::new(1.0, 2.0, 3.0),
    };
    let mut tensor = ConstitutiveTensor::<f64, U3>::zeros();
    AnisotropicViscosity
        .populate_constitutive_tensor(&mut tensor, &params)
        .unwrap();
    assert!(!tensor.is_diagonal());
    assert_matrix_eq!(
        tensor.matrix(),
        ConstitutiveTensor::<f64, U3>::isotropic(2.0).matrix(),
        comp = abs,
        tol = 1e-14
    );
}

#[test]
fn default_parameters() {
    assert_eq!(ViscosityParameters::<f64>::default().viscosity, 1.0);
    let params = AnisotropicViscosityParameters::<f64, U3>::default();
    assert_eq!(params.viscosity, 1.0);
    assert_eq!(params.second_viscosity, 1.0);
    assert_eq!(params.director, Vector3::z());
}

#[test]
fn default_viscosity_derivatives_are_zero() {
    let derivatives = Rheology::<f64, U2>::compute_viscosity_derivatives(
        &IsotropicViscosity,
        &ViscosityParameters { viscosity: 5.0 },
        &Vector2::new(1.0, 2.0),
        &Matrix2::new(1.0, 2.0, 3.0, 4.0),
    )
    .unwrap();
    assert_eq!(derivatives.velocity, Vector2::zeros());
    assert_eq!(derivatives.velocity_gradient, Matrix2::zeros());
}

#[test]
fn anisotropic_parameters_json_round_trip() {
    let params = AnisotropicViscosityParameters::<f64, U2> {
        viscosity: 10.0,
        second_viscosity: 0.1,
        director: Vector2::new(0.0, 1.0),
    };
    let json = serde_json::to_string(&params).unwrap();
    let deserialized: AnisotropicViscosityParameters<f64, U2> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, params);
}

proptest! {
    #[test]
    fn isotropic_viscosity_populates_diagonal_tensor(params in viscosity_parameters()) {
        let mut tensor = ConstitutiveTensor::<f64, U2>::zeros();
        IsotropicViscosity.populate_constitutive_tensor(&mut tensor, &params).unwrap();
        prop_assert!(tensor.is_diagonal());
        let eta = params.viscosity;
        prop_assert_eq!(tensor.matrix(), &Matrix3::from_diagonal(&Vector3::new(2.0 * eta, 2.0 * eta, eta)));
        prop_assert_eq!(tensor.isotropic_viscosity(), eta);
    }
}
