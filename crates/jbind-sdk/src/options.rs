//! Context configuration

use jbind_schema::AmbiguityPolicy;

/// Options for a [`crate::Jvm`] context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JvmOptions {
    /// What to do when several overloads accept a call
    pub ambiguity: AmbiguityPolicy,
    /// Load classes owned by a custom loader through the class loader of the
    /// receiving instance when the loader has not supplied them yet
    pub loader_fallback: bool,
    /// Turn a pending foreign exception into [`crate::JniError::PendingException`]
    /// after every call
    pub check_exceptions: bool,
}

impl Default for JvmOptions {
    fn default() -> Self {
        Self {
            ambiguity: AmbiguityPolicy::Reject,
            loader_fallback: true,
            check_exceptions: true,
        }
    }
}

impl JvmOptions {
    /// Set the ambiguity policy
    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    /// Enable or disable loading through an instance's class loader
    pub fn loader_fallback(mut self, enabled: bool) -> Self {
        self.loader_fallback = enabled;
        self
    }

    /// Enable or disable exception checks after calls
    pub fn check_exceptions(mut self, enabled: bool) -> Self {
        self.check_exceptions = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fail_closed() {
        let opts = JvmOptions::default();
        assert_eq!(opts.ambiguity, AmbiguityPolicy::Reject);
        assert!(opts.loader_fallback);
        assert!(opts.check_exceptions);
    }

    #[test]
    fn test_setters_chain() {
        let opts = JvmOptions::default()
            .ambiguity(AmbiguityPolicy::FirstDeclared)
            .check_exceptions(false);
        assert_eq!(opts.ambiguity, AmbiguityPolicy::FirstDeclared);
        assert!(!opts.check_exceptions);
    }
}
