//! Helper traits for allocator trait bounds.
use crate::voigt::CartesianDim;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, Scalar, U1};

/// An allocator for a single dimension.
pub trait DimAllocator<T: Scalar, D: DimName>:
    Allocator<T, D>
    + Allocator<T, D, D>
    + Allocator<T, U1, D>
    // Used for decompositions, e.g. determinants
    + Allocator<usize, D>
    + Allocator<(usize, usize), D>
{
}

impl<T, D> DimAllocator<T, D> for DefaultAllocator
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>
        + Allocator<T, D, D>
        + Allocator<T, U1, D>
        + Allocator<usize, D>
        + Allocator<(usize, usize), D>,
{
}

/// An allocator for two dimensions.
pub trait BiDimAllocator<T: Scalar, D1: DimName, D2: DimName>:
    DimAllocator<T, D1> + DimAllocator<T, D2> + Allocator<T, D1, D2> + Allocator<T, D2, D1>
{
}

impl<T: Scalar, D1: DimName, D2: DimName> BiDimAllocator<T, D1, D2> for DefaultAllocator where
    DefaultAllocator: DimAllocator<T, D1> + DimAllocator<T, D2> + Allocator<T, D1, D2> + Allocator<T, D2, D1>
{
}

/// An allocator for a spatial dimension together with its Voigt dimension.
///
/// This covers vectors and matrices in the spatial dimension, constitutive tensors in Voigt form
/// and the mixed strain-displacement matrices between the two.
pub trait CartesianAllocator<T: Scalar, D: CartesianDim>: BiDimAllocator<T, D, D::Voigt> {}

impl<T, D> CartesianAllocator<T, D> for DefaultAllocator
where
    T: Scalar,
    D: CartesianDim,
    DefaultAllocator: BiDimAllocator<T, D, D::Voigt>,
{
}
