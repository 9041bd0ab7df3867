//! Provider definitions: how a token's value gets produced.
//!
//! A provider binds a [`Token`] to one of three production strategies:
//!
//! - a **class provider** constructs an instance from resolved constructor
//!   dependencies (a bare class registration is shorthand for a class
//!   provider whose token is the class's own type token);
//! - a **value provider** hands out a pre-built value;
//! - a **factory provider** runs an async closure over resolved dependencies,
//!   any of which may be marked optional.
//!
//! Dependency tokens are declared explicitly per constructor parameter; there
//! is no type inference. A parameter may additionally carry an override token
//! that takes precedence over the declared one.
//!
//! ```
//! use gantry_core::{ClassProvider, Token, dep};
//! use std::sync::Arc;
//!
//! struct Db;
//! struct UserService { db: Arc<Db> }
//!
//! let provider = ClassProvider::new::<UserService>(|deps| {
//!     Ok(Box::new(UserService { db: dep::<Db>(&deps, 0)? }))
//! })
//! .param(Token::of::<Db>());
//! ```

use crate::error::Error;
use crate::metadata::Scope;
use crate::token::{Token, short_type_name};
use futures_util::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A realized provider value as stored in the instance container.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds an instance from resolved constructor arguments.
pub type ConstructFn =
    Arc<dyn Fn(Vec<Instance>) -> Result<Box<dyn Any + Send + Sync>, Error> + Send + Sync>;

/// Async factory over resolved dependencies; optional dependencies that
/// failed to resolve arrive as `None`.
pub type FactoryFn = Arc<
    dyn Fn(Vec<Option<Instance>>) -> BoxFuture<'static, Result<Instance, Error>> + Send + Sync,
>;

/// Assigns a resolved dependency onto a not-yet-shared instance.
pub type AssignFn = Arc<dyn Fn(&mut dyn Any, Instance) -> Result<(), Error> + Send + Sync>;

/// Downcast helper for constructor closures: the dependency at `index`,
/// as resolved by the injector.
pub fn dep<T: Send + Sync + 'static>(deps: &[Instance], index: usize) -> Result<Arc<T>, Error> {
    let instance = deps.get(index).ok_or_else(|| Error::Internal(format!(
        "constructor argument {} missing for {}",
        index,
        short_type_name::<T>()
    )))?;
    instance.clone().downcast::<T>().map_err(|_| {
        Error::Internal(format!(
            "constructor argument {} is not a {}",
            index,
            short_type_name::<T>()
        ))
    })
}

/// One constructor parameter: the declared dependency token, plus an optional
/// override that takes precedence (the explicit-token analog of `@Inject`).
#[derive(Clone, Debug)]
pub struct ConstructorParam {
    pub declared: Option<Token>,
    pub overridden: Option<Token>,
}

impl ConstructorParam {
    /// The token the injector resolves for this parameter, if any.
    pub fn effective(&self) -> Option<&Token> {
        self.overridden.as_ref().or(self.declared.as_ref())
    }
}

/// A property assigned after construction, the setter-injection analog.
#[derive(Clone)]
pub struct PropertyInjection {
    pub name: &'static str,
    pub token: Token,
    pub assign: AssignFn,
}

impl fmt::Debug for PropertyInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInjection")
            .field("name", &self.name)
            .field("token", &self.token)
            .finish()
    }
}

/// Provider that constructs a class instance from resolved dependencies.
#[derive(Clone)]
pub struct ClassProvider {
    pub provide: Token,
    pub class_name: &'static str,
    pub params: Vec<ConstructorParam>,
    pub properties: Vec<PropertyInjection>,
    pub construct: ConstructFn,
    pub scope: Option<Scope>,
}

impl ClassProvider {
    /// A bare class provider: the class's own type token.
    pub fn new<T: 'static>(
        construct: impl Fn(Vec<Instance>) -> Result<Box<dyn Any + Send + Sync>, Error>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::with_token::<T>(Token::of::<T>(), construct)
    }

    /// A `{ provide, useClass }` provider: custom token, class construction.
    pub fn with_token<T: 'static>(
        provide: Token,
        construct: impl Fn(Vec<Instance>) -> Result<Box<dyn Any + Send + Sync>, Error>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            provide,
            class_name: short_type_name::<T>(),
            params: Vec::new(),
            properties: Vec::new(),
            construct: Arc::new(construct),
            scope: None,
        }
    }

    /// Declare the next constructor parameter's dependency token.
    pub fn param(mut self, token: Token) -> Self {
        self.params.push(ConstructorParam {
            declared: Some(token),
            overridden: None,
        });
        self
    }

    /// Declare a constructor parameter with no resolvable token. Resolution
    /// fails with a named-index error unless an override is supplied.
    pub fn param_untyped(mut self) -> Self {
        self.params.push(ConstructorParam {
            declared: None,
            overridden: None,
        });
        self
    }

    /// Override the token for the parameter at `index`.
    pub fn inject_at(mut self, index: usize, token: Token) -> Self {
        while self.params.len() <= index {
            self.params.push(ConstructorParam {
                declared: None,
                overridden: None,
            });
        }
        self.params[index].overridden = Some(token);
        self
    }

    /// Declare a property injection applied after construction.
    pub fn property(
        mut self,
        name: &'static str,
        token: Token,
        assign: impl Fn(&mut dyn Any, Instance) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Self {
        self.properties.push(PropertyInjection {
            name,
            token,
            assign: Arc::new(assign),
        });
        self
    }

    /// Set the provider scope explicitly, overriding registry metadata.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }
}

impl fmt::Debug for ClassProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassProvider")
            .field("provide", &self.provide)
            .field("class_name", &self.class_name)
            .field("params", &self.params)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Provider that binds a token to a pre-existing value.
#[derive(Clone)]
pub struct ValueProvider {
    pub provide: Token,
    pub value: Instance,
}

impl ValueProvider {
    pub fn new<T: Send + Sync + 'static>(provide: Token, value: T) -> Self {
        Self {
            provide,
            value: Arc::new(value),
        }
    }

    /// Wrap an already-shared value.
    pub fn from_instance(provide: Token, value: Instance) -> Self {
        Self { provide, value }
    }
}

impl fmt::Debug for ValueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueProvider")
            .field("provide", &self.provide)
            .finish()
    }
}

/// One dependency of a factory provider.
#[derive(Clone, Debug)]
pub struct InjectDep {
    pub token: Token,
    pub optional: bool,
}

/// Provider that produces its value through an async factory.
#[derive(Clone)]
pub struct FactoryProvider {
    pub provide: Token,
    pub factory: FactoryFn,
    pub inject: Vec<InjectDep>,
    pub scope: Option<Scope>,
}

impl FactoryProvider {
    pub fn new(
        provide: Token,
        factory: impl Fn(Vec<Option<Instance>>) -> BoxFuture<'static, Result<Instance, Error>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            provide,
            factory: Arc::new(factory),
            inject: Vec::new(),
            scope: None,
        }
    }

    /// Declare a required factory dependency.
    pub fn inject(mut self, token: Token) -> Self {
        self.inject.push(InjectDep {
            token,
            optional: false,
        });
        self
    }

    /// Declare an optional factory dependency; resolution failure substitutes
    /// `None` instead of aborting.
    pub fn inject_optional(mut self, token: Token) -> Self {
        self.inject.push(InjectDep {
            token,
            optional: true,
        });
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }
}

impl fmt::Debug for FactoryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryProvider")
            .field("provide", &self.provide)
            .field("inject", &self.inject)
            .field("scope", &self.scope)
            .finish()
    }
}

/// A provider declaration owned by exactly one module.
#[derive(Clone, Debug)]
pub enum ProviderDef {
    Class(ClassProvider),
    Value(ValueProvider),
    Factory(FactoryProvider),
}

impl ProviderDef {
    /// The token this provider is registered under.
    pub fn token(&self) -> &Token {
        match self {
            ProviderDef::Class(p) => &p.provide,
            ProviderDef::Value(p) => &p.provide,
            ProviderDef::Factory(p) => &p.provide,
        }
    }
}

impl From<ClassProvider> for ProviderDef {
    fn from(p: ClassProvider) -> Self {
        ProviderDef::Class(p)
    }
}

impl From<ValueProvider> for ProviderDef {
    fn from(p: ValueProvider) -> Self {
        ProviderDef::Value(p)
    }
}

impl From<FactoryProvider> for ProviderDef {
    fn from(p: FactoryProvider) -> Self {
        ProviderDef::Factory(p)
    }
}
