use crate::nalgebra::allocator::Allocator;
use crate::nalgebra::{DefaultAllocator, DimName, OPoint, Scalar};
use crate::quadrature::QuadraturePair;
use crate::SmallDim;
use itertools::izip;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Lookup table mapping elements to quadrature rules.
///
/// Each quadrature point carries a `Data` value in addition to its weight and reference
/// coordinates. For viscous assembly this is the per-point rheology parameters.
pub trait QuadratureTable<T, GeometryDim>
where
    T: Scalar,
    GeometryDim: SmallDim,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    type Data: Default + Clone;

    fn element_quadrature_size(&self, element_index: usize) -> usize;

    fn populate_element_data(&self, element_index: usize, data: &mut [Self::Data]);

    fn populate_element_quadrature(
        &self,
        element_index: usize,
        points: &mut [OPoint<T, GeometryDim>],
        weights: &mut [T],
    );

    fn populate_element_quadrature_and_data(
        &self,
        element_index: usize,
        points: &mut [OPoint<T, GeometryDim>],
        weights: &mut [T],
        data: &mut [Self::Data],
    ) {
        self.populate_element_quadrature(element_index, points, weights);
        self.populate_element_data(element_index, data);
    }
}

/// A quadrature table that uses the same rule and data for every element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformQuadratureTable<T, GeometryDim, Data = ()>
where
    T: Scalar,
    GeometryDim: DimName,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    #[serde(bound(serialize = "OPoint<T, GeometryDim>: Serialize"))]
    #[serde(bound(deserialize = "OPoint<T, GeometryDim>: Deserialize<'de>"))]
    points: Vec<OPoint<T, GeometryDim>>,
    weights: Vec<T>,
    data: Vec<Data>,
}

impl<T, GeometryDim> UniformQuadratureTable<T, GeometryDim>
where
    T: Scalar,
    GeometryDim: DimName,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    pub fn from_quadrature(quadrature: QuadraturePair<T, GeometryDim>) -> Self {
        Self::from_quadrature_and_uniform_data(quadrature, ())
    }
}

impl<T, GeometryDim, Data> UniformQuadratureTable<T, GeometryDim, Data>
where
    T: Scalar,
    GeometryDim: DimName,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    pub fn from_points_weights_and_data(points: Vec<OPoint<T, GeometryDim>>, weights: Vec<T>, data: Vec<Data>) -> Self {
        let msg = "Points, weights and data must have the same length.";
        assert_eq!(points.len(), weights.len(), "{}", msg);
        assert_eq!(points.len(), data.len(), "{}", msg);
        Self { points, weights, data }
    }

    pub fn from_quadrature_and_uniform_data(quadrature: QuadraturePair<T, GeometryDim>, data: Data) -> Self
    where
        Data: Clone,
    {
        let (weights, points) = quadrature;
        let data = vec![data; weights.len()];
        Self::from_points_weights_and_data(points, weights, data)
    }

    pub fn with_uniform_data<Data2: Clone>(self, data: Data2) -> UniformQuadratureTable<T, GeometryDim, Data2> {
        UniformQuadratureTable::from_quadrature_and_uniform_data((self.weights, self.points), data)
    }

    /// Expands the table into a general table with one copy of the rule per element.
    pub fn to_general(&self, num_elements: usize) -> GeneralQuadratureTable<T, GeometryDim, Data>
    where
        Data: Clone,
    {
        let mut points = Vec::with_capacity(num_elements * self.points.len());
        let mut weights = Vec::with_capacity(num_elements * self.weights.len());
        let mut data = Vec::with_capacity(num_elements * self.data.len());
        let mut offsets = Vec::with_capacity(num_elements + 1);
        offsets.push(0);
        for _ in 0..num_elements {
            points.extend_from_slice(&self.points);
            weights.extend_from_slice(&self.weights);
            data.extend_from_slice(&self.data);
            offsets.push(weights.len());
        }
        GeneralQuadratureTable {
            points,
            weights,
            data,
            offsets,
        }
    }
}

impl<T, GeometryDim, Data> QuadratureTable<T, GeometryDim> for UniformQuadratureTable<T, GeometryDim, Data>
where
    T: Scalar,
    GeometryDim: SmallDim,
    Data: Clone + Default,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    type Data = Data;

    fn element_quadrature_size(&self, _element_index: usize) -> usize {
        self.points.len()
    }

    fn populate_element_data(&self, _element_index: usize, data: &mut [Self::Data]) {
        assert_eq!(data.len(), self.data.len());
        data.clone_from_slice(&self.data);
    }

    fn populate_element_quadrature(
        &self,
        _element_index: usize,
        points: &mut [OPoint<T, GeometryDim>],
        weights: &mut [T],
    ) {
        assert_eq!(points.len(), self.points.len());
        assert_eq!(weights.len(), self.weights.len());
        points.clone_from_slice(&self.points);
        weights.clone_from_slice(&self.weights);
    }
}

/// A quadrature table that keeps a separate quadrature rule per element.
///
/// The rules are stored contiguously, with `offsets[i]..offsets[i + 1]` indexing the points of
/// element `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralQuadratureTable<T, GeometryDim, Data = ()>
where
    T: Scalar,
    GeometryDim: DimName,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    #[serde(bound(serialize = "OPoint<T, GeometryDim>: Serialize"))]
    #[serde(bound(deserialize = "OPoint<T, GeometryDim>: Deserialize<'de>"))]
    points: Vec<OPoint<T, GeometryDim>>,
    weights: Vec<T>,
    data: Vec<Data>,
    offsets: Vec<usize>,
}

impl<T, GeometryDim, Data> GeneralQuadratureTable<T, GeometryDim, Data>
where
    T: Scalar,
    GeometryDim: DimName,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    /// Constructs a table from one rule per element.
    ///
    /// # Panics
    ///
    /// Panics if the number of points, weights and data entries differ for any element.
    pub fn from_element_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = (Vec<T>, Vec<OPoint<T, GeometryDim>>, Vec<Data>)>,
    {
        let mut table = Self {
            points: Vec::new(),
            weights: Vec::new(),
            data: Vec::new(),
            offsets: vec![0],
        };
        for (element_index, (weights, points, data)) in rules.into_iter().enumerate() {
            assert_eq!(
                points.len(),
                weights.len(),
                "Element {} has mismatched number of points and weights.",
                element_index
            );
            assert_eq!(
                points.len(),
                data.len(),
                "Element {} has mismatched number of points and data.",
                element_index
            );
            table.points.extend(points);
            table.weights.extend(weights);
            table.data.extend(data);
            table.offsets.push(table.weights.len());
        }
        table
    }

    pub fn num_elements(&self) -> usize {
        self.offsets.len() - 1
    }

    fn element_range(&self, element_index: usize) -> Range<usize> {
        assert!(element_index < self.num_elements(), "Element index out of bounds");
        self.offsets[element_index]..self.offsets[element_index + 1]
    }

    /// Replaces the data of the quadrature table by calling the given closure with every quadrature
    /// point in reference coordinates and its element index.
    pub fn with_data_from_fn<NewData>(
        self,
        mut data_fn: impl FnMut(usize, &OPoint<T, GeometryDim>, &Data) -> NewData,
    ) -> GeneralQuadratureTable<T, GeometryDim, NewData> {
        let mut data = Vec::with_capacity(self.data.len());
        for element_index in 0..self.num_elements() {
            let range = self.element_range(element_index);
            for (point, old_data) in izip!(&self.points[range.clone()], &self.data[range]) {
                data.push(data_fn(element_index, point, old_data));
            }
        }

        GeneralQuadratureTable {
            points: self.points,
            weights: self.weights,
            data,
            offsets: self.offsets,
        }
    }
}

impl<T, GeometryDim, Data> QuadratureTable<T, GeometryDim> for GeneralQuadratureTable<T, GeometryDim, Data>
where
    T: Scalar,
    GeometryDim: SmallDim,
    Data: Clone + Default,
    DefaultAllocator: Allocator<T, GeometryDim>,
{
    type Data = Data;

    fn element_quadrature_size(&self, element_index: usize) -> usize {
        self.element_range(element_index).len()
    }

    fn populate_element_data(&self, element_index: usize, data: &mut [Self::Data]) {
        let data_for_element = &self.data[self.element_range(element_index)];
        assert_eq!(data_for_element.len(), data.len());
        data.clone_from_slice(data_for_element);
    }

    fn populate_element_quadrature(
        &self,
        element_index: usize,
        points: &mut [OPoint<T, GeometryDim>],
        weights: &mut [T],
    ) {
        let range = self.element_range(element_index);
        assert_eq!(range.len(), points.len());
        assert_eq!(range.len(), weights.len());
        points.clone_from_slice(&self.points[range.clone()]);
        weights.clone_from_slice(&self.weights[range]);
    }
}
