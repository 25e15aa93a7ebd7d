// diag.rs — Unified diagnostics model
//
// Provides the diagnostic types shared by all analysis passes. Fatal
// analysis errors are converted into error-level diagnostics at the
// pipeline boundary; advisory findings are emitted directly as warnings.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0702`, `W0700`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different semantic
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Call-edge index disagrees with the edge it points at.
    pub const E0700: DiagCode = DiagCode("E0700");
    /// More than one GPU kernel region in one routine.
    pub const E0701: DiagCode = DiagCode("E0701");
    /// Template relation references an unknown template id.
    pub const E0702: DiagCode = DiagCode("E0702");
    /// Conflicting position assignment during propagation.
    pub const E0703: DiagCode = DiagCode("E0703");
    /// Kernel region not attached to a routine.
    pub const E0704: DiagCode = DiagCode("E0704");
    /// Kernel routine without a name.
    pub const E0705: DiagCode = DiagCode("E0705");
    /// Kernel region without any template after filtering.
    pub const E0706: DiagCode = DiagCode("E0706");
    /// Two routines share one name.
    pub const E0707: DiagCode = DiagCode("E0707");

    /// Routine calls both a kernel and a kernel wrapper (first occurrence).
    pub const W0700: DiagCode = DiagCode("W0700");
    /// Same as W0700, abbreviated repeat for a further caller.
    pub const W0701: DiagCode = DiagCode("W0701");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any analysis pass.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// Routine the diagnostic is about, if any.
    pub subject: Option<String>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, subject, or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            subject: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the routine this diagnostic concerns.
    pub fn with_subject(mut self, routine: impl Into<String>) -> Self {
        self.subject = Some(routine.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// True when any diagnostic in `diags` is error-level.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}
