//! Static analysis boundary
//!
//! Declaration discovery, module structure and compilation diagnostics for the
//! TypeScript project being generated into. The pipeline only talks to the
//! project through [`Project`] and a [`TypeChecker`] backend.

pub mod checker;
pub mod project;
pub mod source;

pub use checker::{
    ConformanceChecker, Diagnostic, DiagnosticMessage, TscChecker, TypeChecker,
};
pub use project::{DiscoveryReport, Project, SourceFile, Target};
pub use source::{
    DeclarationKind, ImportDecl, ImportedName, Member, MemberKind, Param, TypeDecl, TypeKind,
};
