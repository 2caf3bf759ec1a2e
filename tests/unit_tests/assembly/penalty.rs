use crate::unit_tests::assembly::{assemble_element, distorted_quad_mesh};
use fenris_viscous::assembly::buffers::BasisFunctionBuffer;
use fenris_viscous::assembly::local::{
    add_element_penalty_term, ElementMatrixAssembler, ElementViscousAssemblerBuilder, NonlinearSolveState,
    PenaltyState, UniformQuadratureTable, ViscousPenaltyConfig,
};
use fenris_viscous::mesh::procedural::create_unit_square_uniform_quad_mesh_2d;
use fenris_viscous::nalgebra::{DMatrix, DMatrixViewMut, DVector};
use fenris_viscous::quadrature;
use fenris_viscous::rheology::{IsotropicViscosity, ViscosityParameters};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};

/// Global gradients at the centroid of the unit square element, node-major.
fn unit_square_centroid_gradients() -> DVector<f64> {
    let signs = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
    DVector::from_fn(8, |k, _| 0.5 * signs[k / 2][k % 2])
}

fn add_penalty(output: &mut DMatrix<f64>, config: &ViscousPenaltyConfig<f64>, state: &PenaltyState<f64>) {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(1);
    add_element_penalty_term(
        DMatrixViewMut::from(output),
        &mesh,
        0,
        config,
        state,
        &mut BasisFunctionBuffer::default(),
    )
    .unwrap();
}

#[test]
fn averaged_viscosity_is_weighted_geometric_mean() {
    let mut state = PenaltyState::default();
    state.accumulate(1.0, 2.0);
    state.accumulate(1.0, 8.0);

    let config = ViscousPenaltyConfig::with_incompressibility_penalty(1.0);
    assert_scalar_eq!(state.averaged_viscosity(&config).unwrap(), 4.0, comp = abs, tol = 1e-12);

    let scaled = ViscousPenaltyConfig {
        scale_by_total_weight: true,
        ..config
    };
    assert_scalar_eq!(state.averaged_viscosity(&scaled).unwrap(), 8.0, comp = abs, tol = 1e-12);

    let unweighted = ViscousPenaltyConfig {
        viscosity_weighting: false,
        ..config
    };
    assert_eq!(state.averaged_viscosity(&unweighted), Some(1.0));
}

#[test]
fn averaged_viscosity_undefined_without_weight() {
    let state = PenaltyState::<f64>::default();
    let config = ViscousPenaltyConfig::with_incompressibility_penalty(1.0);
    assert_eq!(state.averaged_viscosity(&config), None);
}

#[test]
fn penalty_increment_on_unit_square() {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(1);
    let quadrature = quadrature::quadrilateral_gauss(2);
    let eta = 3.0;
    let data = vec![ViscosityParameters { viscosity: eta }; 4];
    let picard = NonlinearSolveState::default();
    let (k, state) = assemble_element(&mesh, 0, &IsotropicViscosity, &picard, None, &quadrature, &data).unwrap();
    assert_scalar_eq!(state.total_weight, 4.0, comp = abs, tol = 1e-12);

    let penalty = 100.0;
    let g = unit_square_centroid_gradients();
    // det J = 1/4 for the unit square
    let expected_increment = penalty * 0.25 * eta * &g * g.transpose();

    let config = ViscousPenaltyConfig::with_incompressibility_penalty(penalty);
    let mut k_penalty = k.clone();
    add_penalty(&mut k_penalty, &config, &state);
    assert_matrix_eq!(&k_penalty - &k, expected_increment, comp = abs, tol = 1e-10);

    let scaled = ViscousPenaltyConfig {
        scale_by_total_weight: true,
        ..config
    };
    let mut k_scaled = k.clone();
    add_penalty(&mut k_scaled, &scaled, &state);
    assert_matrix_eq!(&k_scaled - &k, 4.0 * &expected_increment, comp = abs, tol = 1e-10);

    let unweighted = ViscousPenaltyConfig {
        viscosity_weighting: false,
        ..config
    };
    let mut k_unweighted = k.clone();
    add_penalty(&mut k_unweighted, &unweighted, &state);
    assert_matrix_eq!(&k_unweighted - &k, &expected_increment / eta, comp = abs, tol = 1e-10);
}

#[test]
fn penalty_uses_geometric_mean_of_point_viscosities() {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(1);
    let quadrature = quadrature::quadrilateral_gauss(2);
    let data: Vec<_> = [1.0, 2.0, 4.0, 8.0]
        .into_iter()
        .map(|viscosity| ViscosityParameters { viscosity })
        .collect();
    let picard = NonlinearSolveState::default();
    let (_, state) = assemble_element(&mesh, 0, &IsotropicViscosity, &picard, None, &quadrature, &data).unwrap();

    let config = ViscousPenaltyConfig::with_incompressibility_penalty(1.0);
    let expected = 64.0f64.powf(0.25);
    assert_scalar_eq!(state.averaged_viscosity(&config).unwrap(), expected, comp = abs, tol = 1e-12);
}

#[test]
fn zero_penalty_leaves_matrix_bit_identical() {
    let mesh = distorted_quad_mesh();
    let quadrature = quadrature::quadrilateral_gauss(2);
    let data = vec![ViscosityParameters { viscosity: 2.0 }; 4];
    let picard = NonlinearSolveState::default();
    let (k, state) = assemble_element(&mesh, 0, &IsotropicViscosity, &picard, None, &quadrature, &data).unwrap();

    let mut output = k.clone();
    add_element_penalty_term(
        DMatrixViewMut::from(&mut output),
        &mesh,
        0,
        &ViscousPenaltyConfig::default(),
        &state,
        &mut BasisFunctionBuffer::default(),
    )
    .unwrap();
    assert_eq!(output, k);
}

#[test]
fn penalty_skipped_without_quadrature_weight() {
    let initial = DMatrix::repeat(8, 8, 2.0);
    let mut output = initial.clone();
    let config = ViscousPenaltyConfig::with_incompressibility_penalty(1e3);
    add_penalty(&mut output, &config, &PenaltyState::default());
    assert_eq!(output, initial);
}

#[test]
fn assembler_adds_penalty_term() {
    let mesh = create_unit_square_uniform_quad_mesh_2d::<f64>(1);
    let quadrature = quadrature::quadrilateral_gauss(2);
    let params = ViscosityParameters { viscosity: 0.5 };
    let table = UniformQuadratureTable::from_quadrature_and_uniform_data(quadrature.clone(), params);
    let config = ViscousPenaltyConfig::with_incompressibility_penalty(10.0);
    let assembler = ElementViscousAssemblerBuilder::new()
        .with_geometry(&mesh)
        .with_rheology(&IsotropicViscosity)
        .with_quadrature_table(&table)
        .with_solve_state(NonlinearSolveState::default())
        .build()
        .with_penalty_config(config);
    assert_eq!(assembler.penalty_config(), &config);

    let picard = NonlinearSolveState::default();
    let (mut expected, state) =
        assemble_element(&mesh, 0, &IsotropicViscosity, &picard, None, &quadrature, &[params; 4]).unwrap();
    add_penalty(&mut expected, &config, &state);

    let k = assembler.assemble_element_matrix(0).unwrap();
    assert_matrix_eq!(k, expected, comp = abs, tol = 1e-12);
}

#[test]
fn penalty_config_json_defaults_and_round_trip() {
    let config: ViscousPenaltyConfig<f64> = serde_json::from_str(r#"{ "incompressibility_penalty": 250.0 }"#).unwrap();
    assert_eq!(config.incompressibility_penalty, 250.0);
    assert!(config.viscosity_weighting);
    assert!(!config.scale_by_total_weight);

    let empty: ViscousPenaltyConfig<f64> = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, ViscousPenaltyConfig::default());
    assert!(!empty.is_enabled());

    let config = ViscousPenaltyConfig {
        incompressibility_penalty: 1e4,
        viscosity_weighting: false,
        scale_by_total_weight: true,
    };
    let json = serde_json::to_string(&config).unwrap();
    let deserialized: ViscousPenaltyConfig<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, config);
}

#[test]
fn solve_state_json_defaults() {
    let state: NonlinearSolveState = serde_json::from_str(r#"{ "form_jacobian": true }"#).unwrap();
    assert!(state.form_jacobian);
    assert!(!state.previous_solution_exists);
    assert_eq!(state.nonlinear_iteration, 0);

    let mut state = NonlinearSolveState::default();
    state.record_solve();
    state.record_solve();
    assert!(state.previous_solution_exists);
    assert_eq!(state.nonlinear_iteration, 2);
}
