//! weld: generate type-checked implementations for injected TypeScript services
//!
//! For every interface or abstract class referenced by an `@Inject`-decorated
//! property, weld resolves the declaration's dependencies, asks a model provider
//! for an implementation, normalizes and type-checks the result, repairs it on
//! failure, and finally assembles a wiring module for all implementations.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod context;
pub mod docs;
pub mod error;
pub mod healing;
pub mod lock;
pub mod logging;
pub mod normalizer;
pub mod orchestrator;
pub mod paths;
pub mod prompt;
pub mod provider;
pub mod resolver;
pub mod validator;
pub mod wiring;
