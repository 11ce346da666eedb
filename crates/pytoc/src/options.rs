//! Compile-time configuration (spec §10.2).
//!
//! A plain option struct, not a config-file format - matching the teacher's preference for
//! small structs passed by the caller over a `config`-crate dependency. `pytoc-cli` builds
//! one from its (deliberately minimal) command-line surface.

/// Options threaded through one compilation unit.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Emit a runtime type-assert at the prologue of every function taking a class-typed
    /// parameter, checking the boxed argument's type descriptor against the declared class
    /// before trusting the annotation (spec §9, Open Question, branch (b)). Off by default:
    /// the default contract trusts annotations (branch (a)).
    pub debug_asserts: bool,
    /// Name used for the module registration table and init entry point.
    pub module_name: String,
    /// Emit the checked floor-division/modulus helpers unconditionally, even if no function
    /// in this compilation unit needs them. Useful for snapshot-testing the helpers' C text
    /// in isolation.
    pub force_checked_div_helper: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            debug_asserts: false,
            module_name: "pytoc_module".to_owned(),
            force_checked_div_helper: false,
        }
    }
}
