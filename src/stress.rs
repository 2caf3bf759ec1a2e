//! Recovery of viscous stresses at quadrature points.
use crate::allocators::CartesianAllocator;
use crate::assembly::buffers::BasisFunctionBuffer;
use crate::constitutive::ConstitutiveTensor;
use crate::interpolate::FieldInterpolator;
use crate::rheology::Rheology;
use crate::space::ElementGeometry;
use crate::voigt::{strain_rate_from_velocity_gradient, CartesianDim};
use crate::Real;
use itertools::izip;
use nalgebra::{DefaultAllocator, OPoint, OVector};

/// Computes the Voigt stress at every quadrature point of an element.
///
/// At each point the velocity gradient is interpolated from `velocity_field`, converted to a
/// strain rate and multiplied by the constitutive tensor populated by `rheology`. The stress
/// at point `q` is stored in `stresses[q]`, with tensor (not engineering) shear components.
///
/// # Panics
///
/// Panics if `points`, `data` and `stresses` do not have the same length.
pub fn compute_element_stresses<T, D, Geometry, R>(
    geometry: &Geometry,
    element_index: usize,
    rheology: &R,
    velocity_field: &dyn FieldInterpolator<T, D>,
    points: &[OPoint<T, D>],
    data: &[R::Parameters],
    buffer: &mut BasisFunctionBuffer<T>,
    stresses: &mut [OVector<T, D::Voigt>],
) -> eyre::Result<()>
where
    T: Real,
    D: CartesianDim,
    Geometry: ?Sized + ElementGeometry<T, D>,
    R: ?Sized + Rheology<T, D>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    assert_eq!(points.len(), data.len(), "Points and data must have the same length");
    assert_eq!(points.len(), stresses.len(), "Output must have one stress per point");

    let n = geometry.element_node_count(element_index);
    buffer.resize(n, D::dim());
    geometry.populate_element_nodes(buffer.element_nodes_mut(), element_index);

    let mut tensor = ConstitutiveTensor::<T, D>::zeros();
    for (point, parameters, stress) in izip!(points, data, stresses) {
        geometry.populate_element_basis(element_index, buffer.element_basis_values_mut(), point);
        geometry.populate_element_gradients(element_index, buffer.element_gradients_mut::<D>(), point)?;
        let sample = velocity_field.interpolate_within_element(
            element_index,
            buffer.element_nodes(),
            buffer.element_basis_values(),
            buffer.element_gradients::<D>(),
        );

        tensor.reset();
        rheology.populate_constitutive_tensor(&mut tensor, parameters)?;
        let strain_rate = strain_rate_from_velocity_gradient::<T, D>(&sample.velocity_gradient);
        *stress = tensor.compute_stress(&strain_rate);
    }

    Ok(())
}
