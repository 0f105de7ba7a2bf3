//! Verification Context
//!
//! Everything one checker run needs to know about its surroundings: which
//! plugin is verified against which host, the combined classpath, the class
//! prefixes treated as external and the cancellation token of the task.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::{VerificationError, VerificationResult};
use crate::host::HostVersion;
use crate::plugin::PluginCoordinate;
use crate::resolver::Resolver;

#[derive(Debug, Clone)]
pub struct VerificationContext {
    pub plugin: PluginCoordinate,
    pub host_version: HostVersion,
    /// Plugin, dependencies, host and extra classes, in that order
    pub classpath: Arc<dyn Resolver>,
    external_prefixes: Vec<String>,
    cancellation: CancellationToken,
}

impl VerificationContext {
    pub fn new(plugin: PluginCoordinate, host_version: HostVersion, classpath: Arc<dyn Resolver>) -> Self {
        Self {
            plugin,
            host_version,
            classpath,
            external_prefixes: Vec::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Class name prefixes whose absence is not a problem.
    ///
    /// Both `org.example.` and `org/example/` spellings are accepted.
    pub fn with_external_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.external_prefixes
            .extend(prefixes.into_iter().map(|p| p.as_ref().replace('.', "/")));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn external_prefixes(&self) -> &[String] {
        &self.external_prefixes
    }

    pub fn is_external(&self, class_name: &str) -> bool {
        self.external_prefixes.iter().any(|prefix| class_name.starts_with(prefix.as_str()))
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fail with [`VerificationError::Cancelled`] once the token fires
    pub fn check_cancelled(&self) -> VerificationResult<()> {
        if self.cancellation.is_cancelled() {
            Err(VerificationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::EmptyResolver;

    fn context() -> VerificationContext {
        VerificationContext::new(
            PluginCoordinate::new("com.example", "1.0"),
            HostVersion::parse("IU-163.1").unwrap(),
            Arc::new(EmptyResolver),
        )
    }

    #[test]
    fn test_external_prefixes_accept_dotted_names() {
        let context = context().with_external_prefixes(["org.jetbrains.kotlin.", "com/intellij/"]);
        assert!(context.is_external("org/jetbrains/kotlin/Unit"));
        assert!(context.is_external("com/intellij/Foo"));
        assert!(!context.is_external("org/jetbrains/Other"));
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        let context = context().with_cancellation(token.clone());
        assert!(context.check_cancelled().is_ok());
        token.cancel();
        assert_eq!(context.check_cancelled(), Err(VerificationError::Cancelled));
    }
}
