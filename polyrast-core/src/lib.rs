//! Core data structures for polyrast
//!
//! This crate provides the packed, interleaved array containers used to store
//! large point clouds and the [`VertexMesh`] data model built on top of them.

pub mod error;
pub mod mesh;
pub mod packed;

pub use error::*;
pub use mesh::*;
pub use packed::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Isometry3, Point2, Point3, Point4, Vector3};

/// A 2D point with single precision coordinates
pub type Point2f = Point2<f32>;

/// A 2D point with double precision coordinates
pub type Point2d = Point2<f64>;

/// A 3D point with single precision coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;
