//! Voigt notation for symmetric tensors and the strain-displacement operator.
//!
//! Symmetric tensors are flattened with the normal components first and the shear components
//! after. In two dimensions the ordering is `[xx, yy, xy]`, in three dimensions it is
//! `[xx, yy, zz, xy, xz, yz]`.
//!
//! Given the gradient $\nabla N$ of a nodal basis function, the strain-displacement operator
//! $B$ maps the nodal velocity to the Voigt strain rate (with engineering shear components):
//!
//! ```text
//! 2D:  [ d/dx     0 ]      3D:  [ d/dx     0     0 ]
//!      [    0  d/dy ]           [    0  d/dy     0 ]
//!      [ d/dy  d/dx ]           [    0     0  d/dz ]
//!                               [ d/dy  d/dx     0 ]
//!                               [ d/dz     0  d/dx ]
//!                               [    0  d/dz  d/dy ]
//! ```
use crate::allocators::CartesianAllocator;
use crate::{Real, SmallDim};
use nalgebra::{DefaultAllocator, OMatrix, OVector, U2, U3, U6};
use numeric_literals::replace_float_literals;

/// A spatial dimension in which viscous constitutive tensors can be expressed in Voigt form.
///
/// Implemented for [`U2`] and [`U3`]. The dimension-specific parts of the constitutive model live
/// here, everything else is written generically in terms of the Voigt layout.
pub trait CartesianDim: SmallDim {
    /// The number of independent components of a symmetric tensor in this dimension.
    type Voigt: SmallDim;

    /// The pairs of spatial axes `(a, b)`, `a < b`, associated with each shear component, in
    /// Voigt order. Shear component `k` is stored at Voigt index `Self::dim() + k`.
    const SHEAR_COMPONENTS: &'static [(usize, usize)];

    /// Adds the anisotropic second viscosity correction for the given director and viscosity
    /// contrast (isotropic minus second viscosity) to the given Voigt tensor.
    ///
    /// The correction is symmetric, so the tensor stays symmetric.
    fn add_second_viscosity<T: Real>(
        tensor: &mut OMatrix<T, Self::Voigt, Self::Voigt>,
        delta_viscosity: T,
        director: &OVector<T, Self>,
    ) where
        DefaultAllocator: CartesianAllocator<T, Self>;

    /// Computes the Newton (Jacobian) contribution for a single pair of nodes.
    ///
    /// Entry `(a, b)` of the returned block couples velocity component `a` of the test node with
    /// velocity component `b` of the trial node.
    ///
    /// Returns `None` if Newton linearization is not available in this dimension.
    fn newton_block<T: Real>(params: &NewtonBlockParams<'_, T, Self>) -> Option<OMatrix<T, Self, Self>>
    where
        DefaultAllocator: CartesianAllocator<T, Self>;

    /// Whether [`newton_block`](Self::newton_block) is implemented for this dimension.
    fn supports_newton_linearization() -> bool;
}

/// Per node-pair quantities entering the Newton linearization at a single quadrature point.
#[derive(Debug, Clone, Copy)]
pub struct NewtonBlockParams<'a, T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    /// The isotropic viscosity at the quadrature point.
    pub viscosity: T,
    /// Quadrature weight times the Jacobian determinant.
    pub scale: T,
    /// Velocity gradient, with entry `(c, i)` holding $\partial u_c / \partial x_i$.
    pub velocity_gradient: &'a OMatrix<T, D, D>,
    /// Derivative of the viscosity with respect to each velocity component of the trial node.
    pub viscosity_derivative: &'a OVector<T, D>,
    /// Global basis gradient of the trial node.
    pub trial_gradient: &'a OVector<T, D>,
    /// Global basis gradient of the test node.
    pub test_gradient: &'a OVector<T, D>,
}

impl CartesianDim for U2 {
    type Voigt = U3;

    const SHEAR_COMPONENTS: &'static [(usize, usize)] = &[(0, 1)];

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn add_second_viscosity<T: Real>(
        tensor: &mut OMatrix<T, Self::Voigt, Self::Voigt>,
        delta_viscosity: T,
        director: &OVector<T, Self>,
    ) where
        DefaultAllocator: CartesianAllocator<T, Self>,
    {
        let d = tensor;
        let dv = delta_viscosity;
        let n1 = director[0];
        let n2 = director[1];

        let a0 = 4.0 * dv * n1 * n1 * n2 * n2;
        let a1 = 2.0 * dv * n1 * n2 * (n2 * n2 - n1 * n1);

        d[(0, 0)] += -a0;
        d[(0, 1)] += a0;
        d[(0, 2)] += -a1;
        d[(1, 0)] += a0;
        d[(1, 1)] += -a0;
        d[(1, 2)] += a1;
        d[(2, 0)] += -a1;
        d[(2, 1)] += a1;
        d[(2, 2)] += a0 - dv;
    }

    #[allow(non_snake_case)]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn newton_block<T: Real>(params: &NewtonBlockParams<'_, T, Self>) -> Option<OMatrix<T, Self, Self>>
    where
        DefaultAllocator: CartesianAllocator<T, Self>,
    {
        let eta = params.viscosity;
        let int_fac = params.scale;
        let L = params.velocity_gradient;
        let (du_dx, du_dy) = (L[(0, 0)], L[(0, 1)]);
        let (dv_dx, dv_dy) = (L[(1, 0)], L[(1, 1)]);
        let deta_du = params.viscosity_derivative[0];
        let deta_dv = params.viscosity_derivative[1];
        let (bj_x, bj_y) = (params.trial_gradient[0], params.trial_gradient[1]);
        let (bi_x, bi_y) = (params.test_gradient[0], params.test_gradient[1]);

        let fac = eta * bj_y + du_dy * deta_du + dv_dx * deta_du;
        let k_uu = int_fac * (2.0 * bi_x * (eta * bj_x + du_dx * deta_du) + bi_y * fac);
        let k_vu = int_fac * (2.0 * bi_y * dv_dy * deta_du + bi_x * fac);

        let fac = eta * bj_x + dv_dx * deta_dv + du_dy * deta_dv;
        let k_uv = int_fac * (2.0 * bi_x * du_dx * deta_dv + bi_y * fac);
        let k_vv = int_fac * (2.0 * bi_y * (eta * bj_y + dv_dy * deta_dv) + bi_x * fac);

        let mut block = OMatrix::<T, Self, Self>::zeros();
        block[(0, 0)] = k_uu;
        block[(0, 1)] = k_uv;
        block[(1, 0)] = k_vu;
        block[(1, 1)] = k_vv;
        Some(block)
    }

    fn supports_newton_linearization() -> bool {
        true
    }
}

impl CartesianDim for U3 {
    type Voigt = U6;

    const SHEAR_COMPONENTS: &'static [(usize, usize)] = &[(0, 1), (0, 2), (1, 2)];

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn add_second_viscosity<T: Real>(
        tensor: &mut OMatrix<T, Self::Voigt, Self::Voigt>,
        delta_viscosity: T,
        director: &OVector<T, Self>,
    ) where
        DefaultAllocator: CartesianAllocator<T, Self>,
    {
        let dv = delta_viscosity;
        let n1 = director[0];
        let n2 = director[1];
        let n3 = director[2];

        let a00 = -4.0 * n1*n1 * (1.0 - n1*n1) * dv;
        let a01 =  4.0 * n1*n1 * n2*n2 * dv;
        let a02 =  4.0 * n1*n1 * n3*n3 * dv;
        let a03 =  2.0 * n1*n2 * (2.0*n1*n1 - 1.0) * dv;
        let a04 =  2.0 * n1*n3 * (2.0*n1*n1 - 1.0) * dv;
        let a05 =  4.0 * n1*n1 * n2*n3 * dv;

        let a11 = 4.0 * n2*n2 * (n2*n2 - 1.0) * dv;
        let a12 = 4.0 * n2*n2 * n3*n3 * dv;
        let a13 = 2.0 * n1*n2 * (2.0*n2*n2 - 1.0) * dv;
        let a14 = 4.0 * n1*n2 * n2*n3 * dv;
        let a15 = 2.0 * n2*n3 * (2.0*n2*n2 - 1.0) * dv;

        let a22 = 4.0 * n3*n3 * (n3*n3 - 1.0) * dv;
        let a23 = 4.0 * n1*n2 * n3*n3 * dv;
        let a24 = 2.0 * n1*n3 * (2.0*n3*n3 - 1.0) * dv;
        let a25 = 2.0 * n2*n3 * (2.0*n3*n3 - 1.0) * dv;

        let a33 = (4.0 * n1*n1 * n2*n2 - n1*n1 - n2*n2) * dv;
        let a34 = (4.0 * n1*n1 * n2*n3 - n2*n3) * dv;
        let a35 = (4.0 * n1*n2 * n2*n3 - n1*n3) * dv;

        let a44 = (4.0 * n1*n1 * n3*n3 - n1*n1 - n3*n3) * dv;
        let a45 = (4.0 * n1*n2 * n3*n3 - n1*n2) * dv;

        let a55 = (4.0 * n3*n3 * n2*n2 - n3*n3 - n2*n2) * dv;

        let correction = [
            [a00, a01, a02, a03, a04, a05],
            [a01, a11, a12, a13, a14, a15],
            [a02, a12, a22, a23, a24, a25],
            [a03, a13, a23, a33, a34, a35],
            [a04, a14, a24, a34, a44, a45],
            [a05, a15, a25, a35, a45, a55],
        ];

        for (i, row) in correction.iter().enumerate() {
            for (j, &a_ij) in row.iter().enumerate() {
                tensor[(i, j)] += a_ij;
            }
        }
    }

    fn newton_block<T: Real>(_params: &NewtonBlockParams<'_, T, Self>) -> Option<OMatrix<T, Self, Self>>
    where
        DefaultAllocator: CartesianAllocator<T, Self>,
    {
        // TODO: Derive the 3D Jacobian terms, the 2D expressions do not generalize directly
        None
    }

    fn supports_newton_linearization() -> bool {
        false
    }
}

/// Returns the Voigt index of the shear component coupling the axes `a` and `b`.
///
/// Returns `None` if `a == b` or if the pair does not exist in this dimension.
pub fn shear_index<D: CartesianDim>(a: usize, b: usize) -> Option<usize> {
    let (a, b) = if a < b { (a, b) } else { (b, a) };
    D::SHEAR_COMPONENTS
        .iter()
        .position(|&pair| pair == (a, b))
        .map(|k| D::dim() + k)
}

/// Constructs the strain-displacement operator $B$ for a single node with the given global
/// basis gradient.
pub fn strain_displacement_operator<T, D>(gradient: &OVector<T, D>) -> OMatrix<T, D::Voigt, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    let mut b = OMatrix::<T, D::Voigt, D>::zeros();
    for i in 0..D::dim() {
        b[(i, i)] = gradient[i];
    }
    for (k, &(a, c)) in D::SHEAR_COMPONENTS.iter().enumerate() {
        let row = D::dim() + k;
        b[(row, a)] = gradient[c];
        b[(row, c)] = gradient[a];
    }
    b
}

/// Computes $D B$ for a single node, using only the diagonal entries of `tensor`.
///
/// Only valid if the off-diagonal entries of `tensor` are zero.
pub fn diagonal_db<T, D>(tensor: &OMatrix<T, D::Voigt, D::Voigt>, gradient: &OVector<T, D>) -> OMatrix<T, D::Voigt, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    let mut db = OMatrix::<T, D::Voigt, D>::zeros();
    for i in 0..D::dim() {
        db[(i, i)] = tensor[(i, i)] * gradient[i];
    }
    for (k, &(a, c)) in D::SHEAR_COMPONENTS.iter().enumerate() {
        let row = D::dim() + k;
        db[(row, a)] = tensor[(row, row)] * gradient[c];
        db[(row, c)] = tensor[(row, row)] * gradient[a];
    }
    db
}

/// Computes $D B$ for a single node with a general (symmetric) tensor.
///
/// Only the nonzero entries of $B$ are visited. For each column, the normal component comes
/// first, followed by the shear components in Voigt order.
pub fn full_db<T, D>(tensor: &OMatrix<T, D::Voigt, D::Voigt>, gradient: &OVector<T, D>) -> OMatrix<T, D::Voigt, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    let voigt_dim = D::dim() + D::SHEAR_COMPONENTS.len();
    let mut db = OMatrix::<T, D::Voigt, D>::zeros();
    for i in 0..voigt_dim {
        for j in 0..D::dim() {
            let mut entry = tensor[(i, j)] * gradient[j];
            for (k, &(a, c)) in D::SHEAR_COMPONENTS.iter().enumerate() {
                let col = D::dim() + k;
                if a == j {
                    entry += tensor[(i, col)] * gradient[c];
                } else if c == j {
                    entry += tensor[(i, col)] * gradient[a];
                }
            }
            db[(i, j)] = entry;
        }
    }
    db
}

/// Computes the Voigt strain rate (tensor shear components) from a velocity gradient.
///
/// The velocity gradient has entry `(c, i)` equal to $\partial u_c / \partial x_i$.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn strain_rate_from_velocity_gradient<T, D>(velocity_gradient: &OMatrix<T, D, D>) -> OVector<T, D::Voigt>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    let l = velocity_gradient;
    let mut strain_rate = OVector::<T, D::Voigt>::zeros();
    for i in 0..D::dim() {
        strain_rate[i] = l[(i, i)];
    }
    for (k, &(a, b)) in D::SHEAR_COMPONENTS.iter().enumerate() {
        strain_rate[D::dim() + k] = 0.5 * (l[(a, b)] + l[(b, a)]);
    }
    strain_rate
}

/// Expands a Voigt vector (tensor shear components) into a full symmetric matrix.
pub fn symmetric_tensor_from_voigt<T, D>(voigt: &OVector<T, D::Voigt>) -> OMatrix<T, D, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    let mut tensor = OMatrix::<T, D, D>::zeros();
    for i in 0..D::dim() {
        tensor[(i, i)] = voigt[i];
    }
    for (k, &(a, b)) in D::SHEAR_COMPONENTS.iter().enumerate() {
        tensor[(a, b)] = voigt[D::dim() + k];
        tensor[(b, a)] = voigt[D::dim() + k];
    }
    tensor
}
