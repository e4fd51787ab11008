//! Core data types for sequence similarity search.
//!
//! - [`Sequence`]: A named nucleotide sequence with its checksum
//! - [`FamilyAssignment`]: Partition of reference names into families
//! - [`FamilyId`]: Family identifier (`Family_1`, `Family_2`, ...)
//!
//! [`Sequence`]: sequence::Sequence
//! [`FamilyAssignment`]: family::FamilyAssignment
//! [`FamilyId`]: types::FamilyId

pub mod family;
pub mod sequence;
pub mod types;
