//! Recoverable parse diagnostics.
//!
//! Everything here is data handed back to the caller or emitted as a
//! `(code, span)` event to the injected [`Reporter`]. The engine never
//! formats, logs, or persists diagnostics itself.

use serde::Serialize;

use crate::token::Span;

/// Coarse issue taxonomy. Only `GrammarLoadError` (see `error.rs`) is ever
/// raised synchronously; all of these are recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    UnknownToken,
    AmbiguousToken,
    StructuralOverflow,
    UnterminatedLiteral,
    Cancelled,
    Truncated,
}

/// Stable numeric diagnostic code, one per recoverable condition. This is
/// the identifier shipped to the Reporter collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticCode {
    UnknownToken,
    AmbiguousToken,
    StrayCloser,
    DepthExceeded,
    UnterminatedBlock,
    TokenBudgetExceeded,
    UnterminatedLiteral,
    IssuesTruncated,
    ParseCancelled,
}

impl DiagnosticCode {
    pub fn number(&self) -> u16 {
        match self {
            DiagnosticCode::UnknownToken => 1001,
            DiagnosticCode::AmbiguousToken => 1002,
            DiagnosticCode::StrayCloser => 1051,
            DiagnosticCode::DepthExceeded => 1052,
            DiagnosticCode::UnterminatedBlock => 1053,
            DiagnosticCode::TokenBudgetExceeded => 1054,
            DiagnosticCode::UnterminatedLiteral => 1055,
            DiagnosticCode::IssuesTruncated => 1090,
            DiagnosticCode::ParseCancelled => 1091,
        }
    }

    pub fn kind(&self) -> IssueKind {
        match self {
            DiagnosticCode::UnknownToken => IssueKind::UnknownToken,
            DiagnosticCode::AmbiguousToken => IssueKind::AmbiguousToken,
            DiagnosticCode::StrayCloser
            | DiagnosticCode::DepthExceeded
            | DiagnosticCode::UnterminatedBlock
            | DiagnosticCode::TokenBudgetExceeded => IssueKind::StructuralOverflow,
            DiagnosticCode::UnterminatedLiteral => IssueKind::UnterminatedLiteral,
            DiagnosticCode::IssuesTruncated => IssueKind::Truncated,
            DiagnosticCode::ParseCancelled => IssueKind::Cancelled,
        }
    }
}

/// A single recovered anomaly, ordered by emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseIssue {
    pub kind: IssueKind,
    pub code: DiagnosticCode,
    pub span: Span,
    pub message: String,
}

impl ParseIssue {
    pub fn new(code: DiagnosticCode, span: Span, message: impl Into<String>) -> ParseIssue {
        ParseIssue {
            kind: code.kind(),
            code,
            span,
            message: message.into(),
        }
    }
}

/// Outward collaborator interface: one `(code, span)` event per issue.
pub trait Reporter {
    fn report(&self, code: DiagnosticCode, span: Span);
}

/// Default collaborator that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _code: DiagnosticCode, _span: Span) {}
}

/// Ordered, capped issue accumulator. Reporting to the collaborator is never
/// capped; only local accumulation stops at `max_errors`, after which a
/// single truncation marker is appended.
pub struct IssueCollector<'r> {
    issues: Vec<ParseIssue>,
    max_errors: usize,
    collect: bool,
    truncated: bool,
    total_seen: usize,
    reporter: &'r dyn Reporter,
}

impl<'r> IssueCollector<'r> {
    pub fn new(max_errors: usize, collect: bool, reporter: &'r dyn Reporter) -> IssueCollector<'r> {
        IssueCollector {
            issues: Vec::new(),
            max_errors,
            collect,
            truncated: false,
            total_seen: 0,
            reporter,
        }
    }

    pub fn push(&mut self, issue: ParseIssue) {
        self.total_seen += 1;
        self.reporter.report(issue.code, issue.span);
        if !self.collect {
            return;
        }
        if self.issues.len() < self.max_errors {
            self.issues.push(issue);
        } else if !self.truncated {
            self.truncated = true;
            let span = issue.span;
            self.issues.push(ParseIssue::new(
                DiagnosticCode::IssuesTruncated,
                span,
                format!("issue limit of {} reached; further issues dropped", self.max_errors),
            ));
        }
    }

    pub fn emit(&mut self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        self.push(ParseIssue::new(code, span, message));
    }

    pub fn total_seen(&self) -> usize {
        self.total_seen
    }

    pub fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ParseIssue> {
        self.issues
    }
}
