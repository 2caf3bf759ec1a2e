//! The viscous constitutive tensor at a single quadrature point.
use crate::allocators::CartesianAllocator;
use crate::voigt::{diagonal_db, full_db, CartesianDim};
use crate::Real;
use nalgebra::{DefaultAllocator, OMatrix, OVector};
use numeric_literals::replace_float_literals;

/// Values with magnitude below this threshold are treated as zero by
/// [`ConstitutiveTensor::set_uniform`].
pub const UNIFORM_ZERO_THRESHOLD: f64 = 1e-20;

/// A symmetric constitutive tensor in Voigt form, mapping strain rates to stresses.
///
/// The tensor is $3 \times 3$ in two dimensions and $6 \times 6$ in three dimensions, see
/// [`voigt`](crate::voigt) for the component ordering. Alongside the tensor we track whether
/// it is known to be diagonal, which enables a cheaper evaluation of $D B$ and of stresses.
///
/// The tensor is meant to be [reset](Self::reset) before it is populated at every quadrature
/// point, so that no structural information leaks from one point to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstitutiveTensor<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    matrix: OMatrix<T, D::Voigt, D::Voigt>,
    is_diagonal: bool,
}

impl<T, D> Default for ConstitutiveTensor<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T, D> ConstitutiveTensor<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    /// A zero tensor, flagged as diagonal.
    pub fn zeros() -> Self {
        Self {
            matrix: OMatrix::<T, D::Voigt, D::Voigt>::zeros(),
            is_diagonal: true,
        }
    }

    /// An isotropic tensor with the given viscosity.
    pub fn isotropic(viscosity: T) -> Self {
        let mut tensor = Self::zeros();
        tensor.isotropic_correction(viscosity);
        tensor
    }

    /// Constructs a tensor from an explicit Voigt matrix.
    ///
    /// The diagonal flag is set if all off-diagonal entries are exactly zero.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not symmetric.
    pub fn from_matrix(matrix: OMatrix<T, D::Voigt, D::Voigt>) -> Self {
        let n = matrix.nrows();
        let mut is_diagonal = true;
        for i in 0..n {
            for j in 0..n {
                assert!(
                    matrix[(i, j)] == matrix[(j, i)],
                    "Constitutive tensor must be symmetric, but entries ({}, {}) and ({}, {}) differ",
                    i,
                    j,
                    j,
                    i
                );
                if i != j && matrix[(i, j)] != T::zero() {
                    is_diagonal = false;
                }
            }
        }
        Self { matrix, is_diagonal }
    }

    /// Zeros the tensor and marks it as diagonal.
    pub fn reset(&mut self) {
        self.matrix.fill(T::zero());
        self.is_diagonal = true;
    }

    /// Sets every entry of the tensor to the given value.
    ///
    /// If `|value| < 1e-20` the tensor is zeroed and marked as diagonal instead. Note that any
    /// other value fills **all** entries, including the off-diagonal ones, so the result is in
    /// general not an isotropic tensor.
    pub fn set_uniform(&mut self, value: T) {
        let threshold = T::from_f64(UNIFORM_ZERO_THRESHOLD).expect("Literal must fit in T");
        if value.abs() < threshold {
            self.reset();
        } else {
            self.matrix.fill(value);
            self.is_diagonal = false;
        }
    }

    /// Adds an isotropic viscosity increment.
    ///
    /// The normal diagonal entries are incremented by `2 * delta` and the shear diagonal entries
    /// by `delta`. The diagonal flag is left unchanged.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn isotropic_correction(&mut self, delta: T) {
        let d = D::dim();
        for i in 0..d {
            self.matrix[(i, i)] += 2.0 * delta;
        }
        for i in d..self.matrix.nrows() {
            self.matrix[(i, i)] += delta;
        }
    }

    /// Adds the anisotropic correction for a second (shear) viscosity along the plane with the
    /// given unit normal (director).
    ///
    /// `delta_viscosity` is the isotropic viscosity minus the second viscosity, so that shearing
    /// along the plane is resisted by the second viscosity. The tensor is always marked as
    /// non-diagonal afterwards.
    pub fn set_second_viscosity(&mut self, delta_viscosity: T, director: &OVector<T, D>) {
        D::add_second_viscosity(&mut self.matrix, delta_viscosity, director);
        self.is_diagonal = false;
    }

    /// The isotropic viscosity, read off the first shear diagonal entry.
    pub fn isotropic_viscosity(&self) -> T {
        let d = D::dim();
        self.matrix[(d, d)]
    }

    /// Multiplies every entry by the given factor.
    pub fn scale(&mut self, factor: T) {
        self.matrix *= factor;
    }

    /// Computes the product $D B$ for a single node with the given global basis gradient.
    ///
    /// Uses only the diagonal of the tensor if it is flagged as diagonal.
    pub fn assemble_db(&self, gradient: &OVector<T, D>) -> OMatrix<T, D::Voigt, D> {
        if self.is_diagonal {
            diagonal_db::<T, D>(&self.matrix, gradient)
        } else {
            full_db::<T, D>(&self.matrix, gradient)
        }
    }

    /// Computes the Voigt stress from a Voigt strain rate with tensor shear components.
    ///
    /// The shear components are doubled to engineering strains before multiplying with the
    /// tensor.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn compute_stress(&self, strain_rate: &OVector<T, D::Voigt>) -> OVector<T, D::Voigt> {
        let d = D::dim();
        let mut engineering_strain = strain_rate.clone();
        for i in d..engineering_strain.len() {
            engineering_strain[i] *= 2.0;
        }

        if self.is_diagonal {
            engineering_strain.component_mul(&self.matrix.diagonal())
        } else {
            &self.matrix * engineering_strain
        }
    }

    pub fn matrix(&self) -> &OMatrix<T, D::Voigt, D::Voigt> {
        &self.matrix
    }

    pub fn is_diagonal(&self) -> bool {
        self.is_diagonal
    }
}
