//! # Core Module
//!
//! Stateless building blocks of pose re-scoring.
//!
//! - **Molecular Representation** ([`models`]) - atoms, bonds and immutable `MoleculeRecord`s
//! - **File I/O** ([`io`]) - lazy record streams over SDF, MOL2, PDB and PDBQT, plus Vina output parsing
//! - **Complex Assembly** ([`complex`]) - pairing a pose with the receptor and checking the vocabulary
//! - **Spatial Indexing** ([`spatial`]) - uniform grid used to prune distant receptor atoms
//! - **Featurization** ([`features`]) - feature schema and the pairwise contact fingerprint
//! - **Scoring** ([`scoring`]) - trained models and their serialized artifacts
//!
//! Everything here is free of run-level state: a prepared receptor or a loaded
//! model is an ordinary value that callers share behind an `Arc`.

pub mod complex;
pub mod features;
pub mod io;
pub mod models;
pub mod scoring;
pub mod spatial;
