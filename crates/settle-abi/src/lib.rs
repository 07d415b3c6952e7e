//! Contract interface map for commit-reveal settlement.
//!
//! Turns a raw interface description (contract name -> function and event
//! entries) into typed descriptors the protocol uses to build transactions
//! and to recognize settlement logs.

pub mod error;
pub mod map;
pub mod raw;

pub use error::{AbiError, AbiResult};
pub use map::{AbiEventDescriptor, AbiEventInput, AbiFunctionDescriptor, AbiMap, ReturnKind};
pub use raw::{RawAbiEntry, RawEntryType, RawInterface, RawParam};
