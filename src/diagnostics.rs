use std::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;

/// A fatal translation error. Aborts the whole run and names the pass and the
/// enclosing declaration so the operator can find the offending construct.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{pass}: generic type `{inner}` is nested inside generic type `{outer}`; this is not supported")]
    NestedGenericType {
        pass: &'static str,
        outer: String,
        inner: String,
    },

    #[error("{pass}: unsupported construct in `{decl}`: {detail}")]
    Unsupported {
        pass: &'static str,
        decl: String,
        detail: String,
    },
}

/// A non-fatal problem. The offending method or type is left untranslated and
/// the rest of the program proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub pass: &'static str,
    pub context: String,
    pub message: String,
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}] {}: {}", self.pass, self.context, self.message)
    }
}

/// Collects warnings across passes. Threaded explicitly through the pipeline
/// so behavior is reproducible and testable without capturing console state.
///
/// Warnings are reported once per (pass, context) pair, not once per
/// occurrence.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(
        &mut self,
        pass: &'static str,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        let context = context.into();
        if self
            .warnings
            .iter()
            .any(|w| w.pass == pass && w.context == context)
        {
            return;
        }
        self.warnings.push(Warning {
            pass,
            context,
            message: message.into(),
        });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
