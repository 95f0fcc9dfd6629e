//! Diagnostic collection for the declaration resolver.
//!
//! Semantic errors never abort resolution: every operation that can hit
//! one records it here and continues with a degraded substitute (usually
//! `int` or the error type). Only internal bookkeeping corruption panics.

use symbol_table::GlobalSymbol as Symbol;
use thiserror::Error;

use crate::semantic::TagKind;
use crate::source::SourceSpan;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// Individual diagnostic, ready for a driver to format and print.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: SourceSpan,
}

/// Errors found while resolving declarations.
#[derive(Debug, Clone, Error)]
pub enum SemanticError {
    #[error("redeclaration of `{name}`")]
    Redeclaration { name: Symbol, span: SourceSpan },

    #[error("redeclaration of struct, union or enum tag `{name}`")]
    TagRedeclaration { name: Symbol, span: SourceSpan },

    #[error("`{name}` defined as wrong kind of tag")]
    WrongTagKind { name: Symbol, span: SourceSpan },

    #[error("undefined {kind} tag `{name}`")]
    UndefinedTag {
        kind: TagKind,
        name: Symbol,
        span: SourceSpan,
    },

    #[error("two or more data types in declaration")]
    TwoDataTypes { span: SourceSpan },

    #[error("`{name}` fails to be a typedef or built in type")]
    NotATypeName { name: Symbol, span: SourceSpan },

    #[error("long, short, signed or unsigned used invalidly")]
    InvalidTypeModifier { span: SourceSpan },

    #[error("long and short specified together")]
    LongAndShort { span: SourceSpan },

    #[error("signed and unsigned specified together")]
    SignedAndUnsigned { span: SourceSpan },

    #[error("two or more storage classes in declaration")]
    MultipleStorageClasses { span: SourceSpan },

    #[error("storage class specified in structure field")]
    StorageClassInField { span: SourceSpan },

    #[error("storage class specified in parameter list")]
    StorageClassInParameter { span: SourceSpan },

    #[error("storage class specified in typename")]
    StorageClassInTypename { span: SourceSpan },

    #[error("`auto` specified in external declaration")]
    AutoAtFileScope { span: SourceSpan },

    #[error("`register` specified in external declaration")]
    RegisterAtFileScope { span: SourceSpan },

    #[error("array of voids declared")]
    ArrayOfVoid { span: SourceSpan },

    #[error("array of functions declared")]
    ArrayOfFunctions { span: SourceSpan },

    #[error("function returning a function declared")]
    FunctionReturningFunction { span: SourceSpan },

    #[error("function returning an array declared")]
    FunctionReturningArray { span: SourceSpan },

    #[error("variable or field `{name}` declared void")]
    DeclaredVoid { name: Symbol, span: SourceSpan },

    #[error("field `{name}` declared as a function")]
    FieldDeclaredFunction { name: Symbol, span: SourceSpan },

    #[error("types sometimes given and sometimes omitted in parameter list")]
    MixedParameterList { span: SourceSpan },

    #[error("structure field `{name}` width not an integer constant")]
    FieldWidthNotConstant { name: Symbol, span: SourceSpan },

    #[error("redeclaration of enum `{name}`")]
    EnumRedeclaration { name: Symbol, span: SourceSpan },

    #[error("enumerator value for `{name}` not integer constant")]
    EnumeratorNotConstant { name: Symbol, span: SourceSpan },

    #[error("duplicate label `{name}`")]
    DuplicateLabel { name: Symbol, span: SourceSpan },

    #[error("no label `{name}` visible for goto")]
    NoLabelForGoto { name: Symbol, span: SourceSpan },

    #[error("multiple parameters named `{name}`")]
    MultipleParametersNamed { name: Symbol, span: SourceSpan },

    #[error("type for parameter `{name}` given twice")]
    ParameterTypeGivenTwice { name: Symbol, span: SourceSpan },

    #[error("parameter name missing from parameter list")]
    ParameterNameMissing { span: SourceSpan },

    #[error("declaration for parameter `{name}` but no such parameter")]
    NoSuchParameter { name: Symbol, span: SourceSpan },

    #[error("size missing in array declaration")]
    ArraySizeMissing { span: SourceSpan },
}

impl SemanticError {
    pub fn span(&self) -> SourceSpan {
        match self {
            SemanticError::Redeclaration { span, .. }
            | SemanticError::TagRedeclaration { span, .. }
            | SemanticError::WrongTagKind { span, .. }
            | SemanticError::UndefinedTag { span, .. }
            | SemanticError::TwoDataTypes { span }
            | SemanticError::NotATypeName { span, .. }
            | SemanticError::InvalidTypeModifier { span }
            | SemanticError::LongAndShort { span }
            | SemanticError::SignedAndUnsigned { span }
            | SemanticError::MultipleStorageClasses { span }
            | SemanticError::StorageClassInField { span }
            | SemanticError::StorageClassInParameter { span }
            | SemanticError::StorageClassInTypename { span }
            | SemanticError::AutoAtFileScope { span }
            | SemanticError::RegisterAtFileScope { span }
            | SemanticError::ArrayOfVoid { span }
            | SemanticError::ArrayOfFunctions { span }
            | SemanticError::FunctionReturningFunction { span }
            | SemanticError::FunctionReturningArray { span }
            | SemanticError::DeclaredVoid { span, .. }
            | SemanticError::FieldDeclaredFunction { span, .. }
            | SemanticError::MixedParameterList { span }
            | SemanticError::FieldWidthNotConstant { span, .. }
            | SemanticError::EnumRedeclaration { span, .. }
            | SemanticError::EnumeratorNotConstant { span, .. }
            | SemanticError::DuplicateLabel { span, .. }
            | SemanticError::NoLabelForGoto { span, .. }
            | SemanticError::MultipleParametersNamed { span, .. }
            | SemanticError::ParameterTypeGivenTwice { span, .. }
            | SemanticError::ParameterNameMissing { span }
            | SemanticError::NoSuchParameter { span, .. }
            | SemanticError::ArraySizeMissing { span } => *span,
        }
    }
}

/// Conditions that never alter control flow; most are pedantic-gated by
/// the caller before being reported.
#[derive(Debug, Clone, Error)]
pub enum SemanticWarning {
    #[error("empty declaration")]
    EmptyDeclaration { span: SourceSpan },

    #[error("zero-size array")]
    ZeroSizeArray { span: SourceSpan },
}

impl SemanticWarning {
    pub fn span(&self) -> SourceSpan {
        match self {
            SemanticWarning::EmptyDeclaration { span } | SemanticWarning::ZeroSizeArray { span } => *span,
        }
    }
}

/// Diagnostic engine for collecting semantic errors and warnings.
#[derive(Default)]
pub struct DiagnosticEngine {
    pub diagnostics: Vec<Diagnostic>,
    pub warnings_as_errors: bool,
    pub disable_all_warnings: bool,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        DiagnosticEngine::default()
    }

    pub fn report(&mut self, error: SemanticError) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: error.to_string(),
            span: error.span(),
        });
    }

    pub fn report_warning(&mut self, warning: SemanticWarning) {
        if self.disable_all_warnings {
            return;
        }
        let level = if self.warnings_as_errors {
            DiagnosticLevel::Error
        } else {
            DiagnosticLevel::Warning
        };
        self.diagnostics.push(Diagnostic {
            level,
            message: warning.to_string(),
            span: warning.span(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
