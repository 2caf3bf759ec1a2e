use crate::allocators::CartesianAllocator;
use crate::assembly::buffers::{BasisFunctionBuffer, QuadratureBuffer};
use crate::assembly::local::{
    add_element_penalty_term, ElementConnectivityAssembler, ElementMatrixAssembler, PenaltyState, QuadratureTable,
    ViscousPenaltyConfig,
};
use crate::constitutive::ConstitutiveTensor;
use crate::interpolate::FieldInterpolator;
use crate::nalgebra::{DMatrixViewMut, DefaultAllocator, OMatrix, OPoint};
use crate::rheology::Rheology;
use crate::space::ElementGeometry;
use crate::voigt::{strain_displacement_operator, CartesianDim, NewtonBlockParams};
use crate::Real;
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use eyre::{bail, eyre};
use itertools::izip;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// How the viscous operator is linearized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linearization {
    /// Fixed-point linearization, with the viscosity frozen at its current value.
    Picard,
    /// Full Jacobian, including the derivative of the viscosity with respect to the velocity.
    Newton,
}

/// The state of the surrounding nonlinear solver, as far as element assembly is concerned.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonlinearSolveState {
    /// Whether the Jacobian of the nonlinear residual is requested.
    pub form_jacobian: bool,
    /// Whether a velocity solution from a previous iteration is available.
    pub previous_solution_exists: bool,
    pub nonlinear_iteration: usize,
}

impl NonlinearSolveState {
    pub fn linearization(&self) -> Linearization {
        if self.form_jacobian {
            Linearization::Newton
        } else {
            Linearization::Picard
        }
    }

    /// Records the completion of a nonlinear iteration.
    pub fn record_solve(&mut self) {
        self.previous_solution_exists = true;
        self.nonlinear_iteration += 1;
    }
}

/// Adds the block `(test_node, trial_node)` of a node-blocked element matrix.
fn add_node_block<T, D>(output: &mut DMatrixViewMut<T>, test_node: usize, trial_node: usize, block: &OMatrix<T, D, D>)
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    let d = D::dim();
    for a in 0..d {
        for b in 0..d {
            output[(d * test_node + a, d * trial_node + b)] += block[(a, b)];
        }
    }
}

/// Accumulates the viscous element matrix of a single element into `output`.
///
/// Row and column `d * i + a` correspond to velocity component `a` of local node `i`. For each
/// quadrature point, the rheology populates a fresh constitutive tensor $D$, which is then scaled
/// by $w |\det J|$. The Picard linearization adds $B_i^T D B_j$ to block `(i, j)`, while the
/// Newton linearization additionally accounts for the dependence of the viscosity on the
/// velocity field. The latter is only available in two dimensions and requires a velocity field.
///
/// Returns the accumulated log viscosity and total quadrature weight of the element, which are
/// needed for [`add_element_penalty_term`].
///
/// Any unsupported linearization is rejected before `output` is modified. Errors from the geometry
/// or rheology may leave `output` partially accumulated.
///
/// # Panics
///
/// Panics if the quadrature data arrays do not have the same lengths, or if `output` is not of
/// size `d * n` for an element with `n` nodes.
#[allow(clippy::too_many_arguments)]
pub fn assemble_element_viscous_matrix<T, D, Geometry, R>(
    mut output: DMatrixViewMut<T>,
    geometry: &Geometry,
    element_index: usize,
    rheology: &R,
    solve_state: &NonlinearSolveState,
    velocity_field: Option<&dyn FieldInterpolator<T, D>>,
    quadrature_weights: &[T],
    quadrature_points: &[OPoint<T, D>],
    quadrature_data: &[R::Parameters],
    buffer: &mut BasisFunctionBuffer<T>,
) -> eyre::Result<PenaltyState<T>>
where
    T: Real,
    D: CartesianDim,
    Geometry: ?Sized + ElementGeometry<T, D>,
    R: ?Sized + Rheology<T, D>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    assert_eq!(quadrature_weights.len(), quadrature_points.len());
    assert_eq!(quadrature_points.len(), quadrature_data.len());

    let d = D::dim();
    let n = geometry.element_node_count(element_index);
    assert_eq!(output.nrows(), d * n, "Output matrix dimension mismatch");
    assert_eq!(output.ncols(), d * n, "Output matrix dimension mismatch");

    let newton_field = match solve_state.linearization() {
        Linearization::Picard => None,
        Linearization::Newton => {
            if !D::supports_newton_linearization() {
                bail!("Newton linearization of the viscous operator is not supported in {} dimensions", d);
            }
            let field = velocity_field
                .ok_or_else(|| eyre!("Newton linearization of the viscous operator requires a velocity field"))?;
            Some(field)
        }
    };
    if newton_field.is_some() {
        debug!(
            "Assembling Newton viscous matrix for element {} (nonlinear iteration {})",
            element_index, solve_state.nonlinear_iteration
        );
    }

    buffer.resize(n, d);
    geometry.populate_element_nodes(buffer.element_nodes_mut(), element_index);

    let mut tensor = ConstitutiveTensor::<T, D>::zeros();
    let mut penalty_state = PenaltyState::default();

    for (&weight, point, parameters) in izip!(quadrature_weights, quadrature_points, quadrature_data) {
        geometry.populate_element_basis(element_index, buffer.element_basis_values_mut(), point);
        let j_det = geometry.populate_element_gradients(element_index, buffer.element_gradients_mut::<D>(), point)?;
        let gradients = buffer.element_gradients::<D>();
        let basis_values = buffer.element_basis_values();

        tensor.reset();
        rheology.populate_constitutive_tensor(&mut tensor, parameters)?;
        let viscosity = tensor.isotropic_viscosity();
        penalty_state.accumulate(weight, viscosity);

        let scale = weight * j_det.abs();

        if let Some(field) = newton_field {
            let sample = field.interpolate_within_element(element_index, buffer.element_nodes(), basis_values, gradients);
            let derivatives =
                rheology.compute_viscosity_derivatives(parameters, &sample.velocity, &sample.velocity_gradient)?;
            for j in 0..n {
                let trial_gradient = gradients.column(j).clone_owned();
                let viscosity_derivative = derivatives.nodal_derivative(basis_values[j], &trial_gradient);
                for i in 0..n {
                    let test_gradient = gradients.column(i).clone_owned();
                    let params = NewtonBlockParams {
                        viscosity,
                        scale,
                        velocity_gradient: &sample.velocity_gradient,
                        viscosity_derivative: &viscosity_derivative,
                        trial_gradient: &trial_gradient,
                        test_gradient: &test_gradient,
                    };
                    let block = D::newton_block(&params)
                        .ok_or_else(|| eyre!("Newton block unavailable in {} dimensions", d))?;
                    add_node_block(&mut output, i, j, &block);
                }
            }
        } else {
            tensor.scale(scale);
            for j in 0..n {
                let db_j = tensor.assemble_db(&gradients.column(j).clone_owned());
                for i in 0..n {
                    let b_i = strain_displacement_operator::<T, D>(&gradients.column(i).clone_owned());
                    add_node_block(&mut output, i, j, &b_i.tr_mul(&db_j));
                }
            }
        }
    }

    Ok(penalty_state)
}

pub struct ElementViscousAssemblerBuilder<Geometry, R, QTable, State> {
    geometry: Geometry,
    rheology: R,
    qtable: QTable,
    solve_state: State,
}

impl ElementViscousAssemblerBuilder<(), (), (), ()> {
    pub fn new() -> Self {
        Self {
            geometry: (),
            rheology: (),
            qtable: (),
            solve_state: (),
        }
    }
}

impl Default for ElementViscousAssemblerBuilder<(), (), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, QTable, State> ElementViscousAssemblerBuilder<(), R, QTable, State> {
    pub fn with_geometry<Geometry: ?Sized>(
        self,
        geometry: &Geometry,
    ) -> ElementViscousAssemblerBuilder<&Geometry, R, QTable, State> {
        ElementViscousAssemblerBuilder {
            geometry,
            rheology: self.rheology,
            qtable: self.qtable,
            solve_state: self.solve_state,
        }
    }
}

impl<Geometry, QTable, State> ElementViscousAssemblerBuilder<Geometry, (), QTable, State> {
    pub fn with_rheology<R: ?Sized>(self, rheology: &R) -> ElementViscousAssemblerBuilder<Geometry, &R, QTable, State> {
        ElementViscousAssemblerBuilder {
            geometry: self.geometry,
            rheology,
            qtable: self.qtable,
            solve_state: self.solve_state,
        }
    }
}

impl<Geometry, R, State> ElementViscousAssemblerBuilder<Geometry, R, (), State> {
    pub fn with_quadrature_table<QTable: ?Sized>(
        self,
        qtable: &QTable,
    ) -> ElementViscousAssemblerBuilder<Geometry, R, &QTable, State> {
        ElementViscousAssemblerBuilder {
            geometry: self.geometry,
            rheology: self.rheology,
            qtable,
            solve_state: self.solve_state,
        }
    }
}

impl<Geometry, R, QTable> ElementViscousAssemblerBuilder<Geometry, R, QTable, ()> {
    pub fn with_solve_state(
        self,
        solve_state: NonlinearSolveState,
    ) -> ElementViscousAssemblerBuilder<Geometry, R, QTable, NonlinearSolveState> {
        ElementViscousAssemblerBuilder {
            geometry: self.geometry,
            rheology: self.rheology,
            qtable: self.qtable,
            solve_state,
        }
    }
}

impl<'a, Geometry, R, QTable> ElementViscousAssemblerBuilder<&'a Geometry, &'a R, &'a QTable, NonlinearSolveState>
where
    Geometry: ?Sized,
    R: ?Sized,
    QTable: ?Sized,
{
    /// Builds an assembler without a velocity field and with the penalty term disabled.
    ///
    /// The penalty and velocity field can be set on the resulting assembler.
    pub fn build<T, D>(self) -> ElementViscousAssembler<'a, T, D, Geometry, R, QTable>
    where
        T: Real,
        D: CartesianDim,
        Geometry: ElementGeometry<T, D>,
        DefaultAllocator: CartesianAllocator<T, D>,
    {
        ElementViscousAssembler {
            geometry: self.geometry,
            rheology: self.rheology,
            qtable: self.qtable,
            solve_state: self.solve_state,
            velocity_field: None,
            penalty_config: ViscousPenaltyConfig::default(),
        }
    }
}

/// Assembles viscous element matrices, including the incompressibility penalty term.
pub struct ElementViscousAssembler<'a, T, D, Geometry: ?Sized, R: ?Sized, QTable: ?Sized>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    geometry: &'a Geometry,
    rheology: &'a R,
    qtable: &'a QTable,
    solve_state: NonlinearSolveState,
    velocity_field: Option<&'a (dyn FieldInterpolator<T, D> + Sync)>,
    penalty_config: ViscousPenaltyConfig<T>,
}

impl<'a, T, D, Geometry: ?Sized, R: ?Sized, QTable: ?Sized> ElementViscousAssembler<'a, T, D, Geometry, R, QTable>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    pub fn with_velocity_field(self, velocity_field: &'a (dyn FieldInterpolator<T, D> + Sync)) -> Self {
        Self {
            velocity_field: Some(velocity_field),
            ..self
        }
    }

    pub fn with_penalty_config(self, penalty_config: ViscousPenaltyConfig<T>) -> Self {
        info!(
            "Viscous penalty: incompressibility penalty {:?}, viscosity weighting {}, scale by total weight {}",
            penalty_config.incompressibility_penalty,
            penalty_config.viscosity_weighting,
            penalty_config.scale_by_total_weight
        );
        Self { penalty_config, ..self }
    }

    pub fn solve_state(&self) -> &NonlinearSolveState {
        &self.solve_state
    }

    pub fn penalty_config(&self) -> &ViscousPenaltyConfig<T> {
        &self.penalty_config
    }
}

impl<'a, T, D, Geometry, R, QTable> ElementConnectivityAssembler
    for ElementViscousAssembler<'a, T, D, Geometry, R, QTable>
where
    T: Real,
    D: CartesianDim,
    Geometry: ?Sized + ElementGeometry<T, D>,
    R: ?Sized,
    QTable: ?Sized,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn solution_dim(&self) -> usize {
        D::dim()
    }

    fn num_elements(&self) -> usize {
        self.geometry.num_elements()
    }

    fn num_nodes(&self) -> usize {
        self.geometry.num_nodes()
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        self.geometry.element_node_count(element_index)
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        self.geometry.populate_element_nodes(output, element_index)
    }
}

#[derive(Debug)]
struct ViscousAssemblerWorkspace<T, D, Data>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    quadrature_buffer: QuadratureBuffer<T, D, Data>,
    basis_buffer: BasisFunctionBuffer<T>,
}

impl<T, D, Data> Default for ViscousAssemblerWorkspace<T, D, Data>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn default() -> Self {
        Self {
            quadrature_buffer: Default::default(),
            basis_buffer: Default::default(),
        }
    }
}

define_thread_local_workspace!(WORKSPACE);

impl<'a, T, D, Geometry, R, QTable> ElementMatrixAssembler<T> for ElementViscousAssembler<'a, T, D, Geometry, R, QTable>
where
    T: Real,
    D: CartesianDim,
    Geometry: ?Sized + ElementGeometry<T, D>,
    R: ?Sized + Rheology<T, D>,
    R::Parameters: 'static,
    QTable: ?Sized + QuadratureTable<T, D, Data = R::Parameters>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn assemble_element_matrix_into(&self, element_index: usize, mut output: DMatrixViewMut<T>) -> eyre::Result<()> {
        let s = self.solution_dim();
        let n = self.element_node_count(element_index);
        assert_eq!(output.nrows(), s * n, "Output matrix dimension mismatch");
        assert_eq!(output.ncols(), s * n, "Output matrix dimension mismatch");

        output.fill(T::zero());

        with_thread_local_workspace(&WORKSPACE, |ws: &mut ViscousAssemblerWorkspace<T, D, R::Parameters>| {
            ws.quadrature_buffer
                .populate_element_quadrature_from_table(element_index, self.qtable);

            let velocity_field = self
                .velocity_field
                .map(|field| field as &dyn FieldInterpolator<T, D>);
            let penalty_state = assemble_element_viscous_matrix(
                DMatrixViewMut::from(&mut output),
                self.geometry,
                element_index,
                self.rheology,
                &self.solve_state,
                velocity_field,
                ws.quadrature_buffer.weights(),
                ws.quadrature_buffer.points(),
                ws.quadrature_buffer.data(),
                &mut ws.basis_buffer,
            )?;

            add_element_penalty_term(
                DMatrixViewMut::from(&mut output),
                self.geometry,
                element_index,
                &self.penalty_config,
                &penalty_state,
                &mut ws.basis_buffer,
            )
        })
    }
}
