//! # Core Models Module
//!
//! Data structures describing parsed molecular structures.
//!
//! ## Key Components
//!
//! - [`record`] - [`record::MoleculeRecord`], an immutable structure with atoms, bonds and properties
//! - [`atom`] - Atom representation with element, coordinates and charges
//! - [`topology`] - Bonds and bond orders
//! - [`element`] - Element symbol recognition
//!
//! Records are produced by the readers in [`crate::core::io`] and consumed by the
//! featurizer; nothing mutates a record after it is built.

pub mod atom;
pub mod element;
pub mod record;
pub mod topology;
