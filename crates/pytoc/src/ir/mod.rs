//! The typed intermediate representation: expression and statement node kinds, function and
//! class descriptors, the known-class registry, and the builder that produces all of the
//! above from a surface AST.

pub mod builder;
pub mod descriptor;
pub mod expr;
pub mod registry;
pub mod stmt;

use descriptor::{ClassDescriptor, FunctionDescriptor};

/// The output of the IR Builder stage: an ordered module IR (spec §4.1).
///
/// Arena-per-module ownership (spec §9): every node reachable from a `Module` belongs to one
/// compilation unit and is never retained across units.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Module {
    pub functions: Vec<FunctionDescriptor>,
    pub classes: Vec<ClassDescriptor>,
}

impl Module {
    /// Serializes this module IR to bytes (spec §8, round-trip/idempotence).
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Restores a module IR from bytes produced by [`Self::dump`].
    ///
    /// # Errors
    /// Returns an error if deserialization fails.
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_then_load_round_trips_an_empty_module() {
        let module = Module { functions: vec![], classes: vec![] };
        let bytes = module.dump().expect("dump");
        let restored = Module::load(&bytes).expect("load");
        assert_eq!(restored.functions.len(), module.functions.len());
        assert_eq!(restored.classes.len(), module.classes.len());
    }
}
