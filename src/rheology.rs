//! Rheologies populate the constitutive tensor at a quadrature point.
use crate::allocators::CartesianAllocator;
use crate::constitutive::ConstitutiveTensor;
use crate::voigt::CartesianDim;
use crate::Real;
use eyre::bail;
use nalgebra::{DefaultAllocator, OMatrix, OVector};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Derivatives of the isotropic viscosity with respect to the velocity field at a point.
///
/// Only needed for the Newton linearization.
#[derive(Debug, Clone, PartialEq)]
pub struct ViscosityDerivatives<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    /// Entry `c` holds $\partial \eta / \partial u_c$.
    pub velocity: OVector<T, D>,
    /// Entry `(c, i)` holds $\partial \eta / \partial (\partial u_c / \partial x_i)$.
    pub velocity_gradient: OMatrix<T, D, D>,
}

impl<T, D> ViscosityDerivatives<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    pub fn zeros() -> Self {
        Self {
            velocity: OVector::<T, D>::zeros(),
            velocity_gradient: OMatrix::<T, D, D>::zeros(),
        }
    }

    /// The derivative of the viscosity with respect to each velocity component of a node with the
    /// given basis value and global basis gradient.
    pub fn nodal_derivative(&self, basis_value: T, basis_gradient: &OVector<T, D>) -> OVector<T, D> {
        let mut result = &self.velocity_gradient * basis_gradient;
        result.axpy(basis_value, &self.velocity, T::one());
        result
    }
}

/// A rheology maps per-point material parameters to a viscous constitutive tensor.
pub trait Rheology<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    /// The per-quadrature-point material parameters.
    type Parameters: Default + Clone;

    /// Populates the given tensor, which has been reset beforehand.
    fn populate_constitutive_tensor(
        &self,
        tensor: &mut ConstitutiveTensor<T, D>,
        parameters: &Self::Parameters,
    ) -> eyre::Result<()>;

    /// Computes the derivatives of the isotropic viscosity with respect to the velocity field.
    ///
    /// The default implementation corresponds to a viscosity that does not depend on the
    /// velocity.
    fn compute_viscosity_derivatives(
        &self,
        _parameters: &Self::Parameters,
        _velocity: &OVector<T, D>,
        _velocity_gradient: &OMatrix<T, D, D>,
    ) -> eyre::Result<ViscosityDerivatives<T, D>> {
        Ok(ViscosityDerivatives::zeros())
    }
}

impl<T, D, R> Rheology<T, D> for &R
where
    T: Real,
    D: CartesianDim,
    R: ?Sized + Rheology<T, D>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    type Parameters = R::Parameters;

    fn populate_constitutive_tensor(
        &self,
        tensor: &mut ConstitutiveTensor<T, D>,
        parameters: &Self::Parameters,
    ) -> eyre::Result<()> {
        R::populate_constitutive_tensor(self, tensor, parameters)
    }

    fn compute_viscosity_derivatives(
        &self,
        parameters: &Self::Parameters,
        velocity: &OVector<T, D>,
        velocity_gradient: &OMatrix<T, D, D>,
    ) -> eyre::Result<ViscosityDerivatives<T, D>> {
        R::compute_viscosity_derivatives(self, parameters, velocity, velocity_gradient)
    }
}

fn check_viscosity<T: Real>(viscosity: T) -> eyre::Result<()> {
    if !(viscosity > T::zero()) || !viscosity.is_finite() {
        bail!("Viscosity must be positive and finite, got {:?}", viscosity);
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViscosityParameters<T> {
    pub viscosity: T,
}

impl<T: Real> Default for ViscosityParameters<T> {
    fn default() -> Self {
        Self { viscosity: T::one() }
    }
}

/// A Newtonian fluid with a per-point isotropic viscosity.
///
/// The resulting tensor is diagonal, with $2 \eta$ on the normal and $\eta$ on the shear
/// components.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsotropicViscosity;

impl<T, D> Rheology<T, D> for IsotropicViscosity
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    type Parameters = ViscosityParameters<T>;

    fn populate_constitutive_tensor(
        &self,
        tensor: &mut ConstitutiveTensor<T, D>,
        parameters: &Self::Parameters,
    ) -> eyre::Result<()> {
        check_viscosity(parameters.viscosity)?;
        tensor.isotropic_correction(parameters.viscosity);
        Ok(())
    }
}

/// Parameters for a transversely isotropic viscous material.
///
/// The material has viscosity `viscosity`, except for shearing along planes with normal
/// `director`, which is resisted by `second_viscosity` instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, OVector<T, D>: Serialize",
    deserialize = "T: Deserialize<'de>, OVector<T, D>: Deserialize<'de>"
))]
pub struct AnisotropicViscosityParameters<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    pub viscosity: T,
    pub second_viscosity: T,
    pub director: OVector<T, D>,
}

impl<T, D> Default for AnisotropicViscosityParameters<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn default() -> Self {
        let mut director = OVector::<T, D>::zeros();
        director[D::dim() - 1] = T::one();
        Self {
            viscosity: T::one(),
            second_viscosity: T::one(),
            director,
        }
    }
}

/// A transversely isotropic viscous material, e.g. a layered or foliated rock.
///
/// The director is normalized before use. A zero director is an error.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnisotropicViscosity;

impl<T, D> Rheology<T, D> for AnisotropicViscosity
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    type Parameters = AnisotropicViscosityParameters<T, D>;

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_constitutive_tensor(
        &self,
        tensor: &mut ConstitutiveTensor<T, D>,
        parameters: &Self::Parameters,
    ) -> eyre::Result<()> {
        check_viscosity(parameters.viscosity)?;
        check_viscosity(parameters.second_viscosity)?;
        let norm = parameters.director.norm();
        if norm == 0.0 {
            bail!("Director of anisotropic viscosity must be nonzero");
        }
        let director = &parameters.director / norm;

        tensor.isotropic_correction(parameters.viscosity);
        tensor.set_second_viscosity(parameters.viscosity - parameters.second_viscosity, &director);
        Ok(())
    }
}
