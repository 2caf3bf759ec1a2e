use crate::allocators::CartesianAllocator;
use crate::assembly::buffers::BasisFunctionBuffer;
use crate::nalgebra::{DMatrixViewMut, DefaultAllocator};
use crate::space::ElementGeometry;
use crate::voigt::CartesianDim;
use crate::Real;
use log::warn;
use serde::{Deserialize, Serialize};

/// Configuration of the incompressibility penalty term.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Real + Deserialize<'de>"))]
pub struct ViscousPenaltyConfig<T> {
    /// The penalty coefficient. A value of exactly zero disables the penalty term.
    pub incompressibility_penalty: T,
    /// Whether to scale the penalty by the element-averaged viscosity.
    pub viscosity_weighting: bool,
    /// Whether to additionally multiply the averaged viscosity by the total quadrature weight
    /// of the element.
    pub scale_by_total_weight: bool,
}

impl<T: Real> Default for ViscousPenaltyConfig<T> {
    fn default() -> Self {
        Self {
            incompressibility_penalty: T::zero(),
            viscosity_weighting: true,
            scale_by_total_weight: false,
        }
    }
}

impl<T: Real> ViscousPenaltyConfig<T> {
    pub fn with_incompressibility_penalty(penalty: T) -> Self {
        Self {
            incompressibility_penalty: penalty,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.incompressibility_penalty != T::zero()
    }
}

/// Running sums of the quadrature-weighted log viscosity over an element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PenaltyState<T> {
    pub log_viscosity_sum: T,
    pub total_weight: T,
}

impl<T: Real> Default for PenaltyState<T> {
    fn default() -> Self {
        Self {
            log_viscosity_sum: T::zero(),
            total_weight: T::zero(),
        }
    }
}

impl<T: Real> PenaltyState<T> {
    pub fn accumulate(&mut self, weight: T, viscosity: T) {
        self.log_viscosity_sum += weight * viscosity.ln();
        self.total_weight += weight;
    }

    /// The viscosity used to scale the penalty term.
    ///
    /// With viscosity weighting this is the weighted geometric mean
    /// $\exp(\sum_q w_q \ln \eta_q / \sum_q w_q)$, optionally multiplied by the total weight.
    /// Without viscosity weighting it is one.
    ///
    /// Returns `None` if viscosity weighting is enabled and the total weight is not positive.
    pub fn averaged_viscosity(&self, config: &ViscousPenaltyConfig<T>) -> Option<T> {
        if !config.viscosity_weighting {
            return Some(T::one());
        }
        if self.total_weight <= T::zero() {
            return None;
        }
        let geometric_mean = (self.log_viscosity_sum / self.total_weight).exp();
        if config.scale_by_total_weight {
            Some(self.total_weight * geometric_mean)
        } else {
            Some(geometric_mean)
        }
    }
}

/// Adds the under-integrated incompressibility penalty term to an element matrix.
///
/// The term is evaluated with a single point at the reference centroid of the element:
/// block `(i, j)` receives
/// $\kappa \, |\det J_0| \, \bar \eta \, \nabla N_i(\xi_0) \nabla N_j(\xi_0)^T$,
/// where $\kappa$ is the penalty coefficient and $\bar \eta$ the
/// [averaged viscosity](PenaltyState::averaged_viscosity).
///
/// Nothing is done if the penalty coefficient is zero. If the element has no quadrature weight,
/// the term is skipped with a warning.
pub fn add_element_penalty_term<T, D, Geometry>(
    mut output: DMatrixViewMut<T>,
    geometry: &Geometry,
    element_index: usize,
    config: &ViscousPenaltyConfig<T>,
    state: &PenaltyState<T>,
    buffer: &mut BasisFunctionBuffer<T>,
) -> eyre::Result<()>
where
    T: Real,
    D: CartesianDim,
    Geometry: ?Sized + ElementGeometry<T, D>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    if !config.is_enabled() {
        return Ok(());
    }

    let d = D::dim();
    let n = geometry.element_node_count(element_index);
    assert_eq!(output.nrows(), d * n, "Output matrix dimension mismatch");
    assert_eq!(output.ncols(), d * n, "Output matrix dimension mismatch");

    if state.total_weight <= T::zero() {
        warn!(
            "Skipping penalty term for element {}: total quadrature weight is not positive",
            element_index
        );
        return Ok(());
    }
    let averaged_viscosity = match state.averaged_viscosity(config) {
        Some(viscosity) => viscosity,
        None => return Ok(()),
    };

    buffer.resize(n, d);
    let centroid = geometry.element_reference_centroid(element_index);
    let j_det = geometry.populate_element_gradients(element_index, buffer.element_gradients_mut::<D>(), &centroid)?;
    let gradients = buffer.element_gradients::<D>();

    let factor = config.incompressibility_penalty * j_det.abs() * averaged_viscosity;
    for i in 0..n {
        for j in 0..n {
            for a in 0..d {
                for b in 0..d {
                    output[(d * i + a, d * j + b)] += factor * gradients[(a, i)] * gradients[(b, j)];
                }
            }
        }
    }

    Ok(())
}
