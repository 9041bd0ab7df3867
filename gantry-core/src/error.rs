// Error types for the Gantry engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is not a registered module; register its descriptor before bootstrap")]
    InvalidModule(String),

    #[error("circular module import detected: {0} is part of a cycle")]
    CircularModuleDependency(String),

    #[error("circular dependency detected for token \"{0}\"")]
    CircularTokenDependency(String),

    #[error(
        "cannot resolve token \"{token}\" from module {module}; make sure the provider is declared in a module and exported if used from another module"
    )]
    UnresolvedToken { token: String, module: String },

    #[error("could not resolve dependency for {class} at constructor parameter {index}; declare a token for it")]
    UnresolvedParameter { class: String, index: usize },

    #[error("unknown parameter kind \"{0}\"")]
    UnknownParamKind(String),

    #[error("duplicate declaration: {0}")]
    DuplicateAnnotation(String),

    #[error("no provider found for token \"{0}\" in the application context")]
    NotFound(String),

    #[error("invalid provider definition for token \"{0}\": {1}")]
    InvalidProvider(String, String),

    #[error("guard \"{0}\" failed: {1}")]
    Guard(String, String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_token() {
        let err = Error::UnresolvedToken {
            token: "DbService".into(),
            module: "UsersModule".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DbService"));
        assert!(msg.contains("UsersModule"));
        assert!(msg.contains("exported"));
    }

    #[test]
    fn test_unresolved_parameter_names_the_index() {
        let err = Error::UnresolvedParameter {
            class: "ChatController".into(),
            index: 2,
        };
        assert!(err.to_string().contains("parameter 2"));
    }
}
