//! Function registry

pub mod aggregate;

use crate::error::EvalError;
use ahash::AHashMap;
use std::fmt;
use std::sync::OnceLock;

/// Function implementation signature
///
/// Receives the evaluated arguments in source order.
pub type FunctionImpl = fn(&[f64]) -> Result<f64, EvalError>;

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

/// Registered function, tagged by arity
#[derive(Clone, Copy)]
pub enum FunctionDef {
    Fixed {
        arity: usize,
        implementation: FunctionImpl,
    },
    Variadic(FunctionImpl),
}

impl FunctionDef {
    pub fn new(arity: Arity, implementation: FunctionImpl) -> Self {
        match arity {
            Arity::Fixed(arity) => FunctionDef::Fixed {
                arity,
                implementation,
            },
            Arity::Variadic => FunctionDef::Variadic(implementation),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            FunctionDef::Fixed { arity, .. } => Arity::Fixed(*arity),
            FunctionDef::Variadic(_) => Arity::Variadic,
        }
    }

    /// Invoke the function, checking the argument count of fixed-arity functions
    pub fn call(&self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
        match self {
            FunctionDef::Fixed {
                arity,
                implementation,
            } => {
                if args.len() != *arity {
                    return Err(EvalError::ArgumentCount {
                        function: name.to_string(),
                        expected: *arity,
                        actual: args.len(),
                    });
                }
                implementation(args)
            }
            FunctionDef::Variadic(implementation) => implementation(args),
        }
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}

/// Name-keyed table of callable functions. Names are case-insensitive.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a registry with the built-in aggregate functions
    ///
    /// `SUM`, `MEAN` (alias `AVERAGE`), `MIN`, `MAX` and `WEIGHTED`, mirroring
    /// the consolidation types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_aggregate_functions();
        registry
    }

    /// Create a registry without any functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, replacing any previous definition of the same name
    pub fn register(&mut self, name: &str, arity: Arity, implementation: FunctionImpl) {
        self.functions
            .insert(name.to_uppercase(), FunctionDef::new(arity, implementation));
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn register_aggregate_functions(&mut self) {
        self.register("SUM", Arity::Variadic, aggregate::fn_sum);
        self.register("MEAN", Arity::Variadic, aggregate::fn_mean);
        self.register("AVERAGE", Arity::Variadic, aggregate::fn_mean);
        self.register("MIN", Arity::Variadic, aggregate::fn_min);
        self.register("MAX", Arity::Variadic, aggregate::fn_max);
        self.register("WEIGHTED", Arity::Variadic, aggregate::fn_weighted);
    }
}

static DEFAULT_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Shared registry with the built-in functions (lazily initialized)
pub fn default_registry() -> &'static FunctionRegistry {
    DEFAULT_REGISTRY.get_or_init(FunctionRegistry::new)
}
