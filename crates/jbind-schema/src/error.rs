//! Schema and selection errors

use thiserror::Error;

/// Errors detected while declaring or resolving a schema.
///
/// All of these are raised before any call into the runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Class name not declared in the namespace
    #[error("Unknown class: {name}")]
    UnknownClass {
        /// Class name that was not found
        name: String,
    },

    /// Member name not declared on the class or any ancestor
    #[error("Unknown {kind} '{member}' on class {class}")]
    UnknownMember {
        /// Class the lookup started from
        class: String,
        /// Member name
        member: String,
        /// Kind of member that was looked up
        kind: String,
    },

    /// Class declares no constructors
    #[error("Class {class} declares no constructors")]
    NoConstructors {
        /// Class name
        class: String,
    },

    /// Parent named in `extends` is not declared
    #[error("Class {class} extends undeclared class {parent}")]
    UnknownParent {
        /// Class declaring the parent
        class: String,
        /// Missing parent name
        parent: String,
    },

    /// Two classes share a name
    #[error("Duplicate class declaration: {name}")]
    DuplicateClass {
        /// Class name
        name: String,
    },

    /// Inheritance chain loops back on itself
    #[error("Circular inheritance detected: {cycle}")]
    CircularInheritance {
        /// Description of the cycle
        cycle: String,
    },

    /// Array rank of zero or above 255
    #[error("Invalid array rank {rank} in {context}")]
    InvalidArrayRank {
        /// Offending rank
        rank: u16,
        /// Where the array was declared
        context: String,
    },

    /// `void` used where a value type is required
    #[error("void is not a value type ({context})")]
    VoidValue {
        /// Where void was used
        context: String,
    },

    /// Two loaders share a name
    #[error("Duplicate class loader declaration: {name}")]
    DuplicateLoader {
        /// Loader name
        name: String,
    },

    /// Loader name not declared in the namespace
    #[error("Unknown class loader: {name}")]
    UnknownLoader {
        /// Loader name
        name: String,
    },

    /// Loader parent chain loops back on itself
    #[error("Circular class loader chain detected: {cycle}")]
    CircularLoaderChain {
        /// Description of the cycle
        cycle: String,
    },

    /// Class listed in the direct set of more than one loader
    #[error("Class {class} is claimed by both {first} and {second}")]
    ClassInMultipleLoaders {
        /// Class name
        class: String,
        /// First claiming loader
        first: String,
        /// Second claiming loader
        second: String,
    },

    /// Class owned by a loader outside the given loader's parent chain
    #[error("Class {class} is not reachable from loader {loader}")]
    ClassUnreachable {
        /// Class name
        class: String,
        /// Loader the lookup started from
        loader: String,
    },
}

/// Errors raised by overload selection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// No declared overload accepts the supplied arguments
    #[error("No viable overload of '{member}' for arguments ({args})")]
    NoViableOverload {
        /// Member name
        member: String,
        /// Normalized argument key
        args: String,
    },

    /// More than one overload accepts the supplied arguments
    #[error("Ambiguous call to '{member}' for arguments ({args}): candidates {candidates:?}")]
    Ambiguous {
        /// Member name
        member: String,
        /// Normalized argument key
        args: String,
        /// Indices of every viable overload, in declaration order
        candidates: Vec<usize>,
    },
}
