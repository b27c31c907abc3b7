//! Structural assembler: folds the resolved token stream into a nesting
//! skeleton and maintains the live context stack the disambiguator reads.
//!
//! The skeleton is not a syntax tree. It records which delimiters pair up,
//! what context each pair opens, and where recovery had to synthesize a
//! close. Statement-level grammar is out of scope on purpose.

use serde::Serialize;

use crate::grammar::ContextKind;
use crate::issue::{DiagnosticCode, IssueCollector};
use crate::registry::CompiledGrammar;
use crate::token::{PunctuationKind, Span, Token, TokenCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Block,
    Expression,
}

/// One paired-delimiter region in the skeleton.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureNode {
    pub kind: NodeKind,
    pub context: ContextKind,
    pub open: Span,
    /// Absent when recovery synthesized the close at end of input.
    pub close: Option<Span>,
    pub depth: usize,
    pub synthesized_close: bool,
    pub children: Vec<StructureNode>,
}

struct Frame {
    node: StructureNode,
    closer: PunctuationKind,
    pushed_context: bool,
}

pub struct Assembler<'g> {
    grammar: &'g CompiledGrammar,
    max_depth: usize,
    stack: Vec<Frame>,
    roots: Vec<StructureNode>,
    contexts: Vec<ContextKind>,
    /// Context a keyword announced for its upcoming block opener.
    pending: Option<ContextKind>,
    /// Expected closers for openers past the depth cap. No nodes are built
    /// for these, but pairing is still checked.
    overflow: Vec<PunctuationKind>,
    depth_warned: bool,
}

impl<'g> Assembler<'g> {
    pub fn new(grammar: &'g CompiledGrammar, max_depth: usize) -> Assembler<'g> {
        Assembler {
            grammar,
            max_depth,
            stack: Vec::new(),
            roots: Vec::new(),
            contexts: vec![ContextKind::TopLevel],
            pending: None,
            overflow: Vec::new(),
            depth_warned: false,
        }
    }

    /// Live context stack, outermost first.
    pub fn contexts(&self) -> &[ContextKind] {
        &self.contexts
    }

    pub fn consume(&mut self, token: &Token, issues: &mut IssueCollector<'_>) {
        self.maybe_end_type_position(token);
        self.apply_push_context(token);

        let TokenCategory::Punctuation(punct) = token.category else {
            return;
        };
        if punct == PunctuationKind::Semicolon {
            self.pending = None;
            return;
        }

        if punct.is_opener() {
            self.open(punct, token.span, issues);
        } else if punct.is_closer() {
            self.close(punct, token.span, issues);
        }
    }

    /// Drain unclosed frames, one issue and one synthesized close each.
    pub fn finish(&mut self, issues: &mut IssueCollector<'_>) -> Vec<StructureNode> {
        while let Some(mut frame) = self.stack.pop() {
            issues.emit(
                DiagnosticCode::UnterminatedBlock,
                frame.node.open,
                "delimiter is never closed; a close was synthesized at end of input",
            );
            frame.node.synthesized_close = true;
            if frame.pushed_context {
                self.contexts.pop();
            }
            self.attach(frame.node);
        }
        std::mem::take(&mut self.roots)
    }

    fn open(&mut self, punct: PunctuationKind, span: Span, issues: &mut IssueCollector<'_>) {
        let depth = self.stack.len() + self.overflow.len();
        if depth >= self.max_depth {
            self.overflow
                .push(punct.closer().unwrap_or(PunctuationKind::Other));
            if !self.depth_warned {
                self.depth_warned = true;
                issues.emit(
                    DiagnosticCode::DepthExceeded,
                    span,
                    format!(
                        "nesting deeper than {} is tracked flat from here on",
                        self.max_depth
                    ),
                );
            }
            return;
        }

        let (kind, context) = match punct {
            PunctuationKind::BraceOpen => {
                let context = self.pending.take().unwrap_or(ContextKind::Block);
                (NodeKind::Block, context)
            }
            _ => (NodeKind::Expression, ContextKind::Expression),
        };
        self.contexts.push(context);
        // `closer()` is Some for every opener; fall back defensively anyway.
        let closer = punct.closer().unwrap_or(PunctuationKind::Other);
        self.stack.push(Frame {
            node: StructureNode {
                kind,
                context,
                open: span,
                close: None,
                depth,
                synthesized_close: false,
                children: Vec::new(),
            },
            closer,
            pushed_context: true,
        });
    }

    fn close(&mut self, punct: PunctuationKind, span: Span, issues: &mut IssueCollector<'_>) {
        if let Some(expected) = self.overflow.last() {
            if *expected == punct {
                self.overflow.pop();
            } else {
                issues.emit(
                    DiagnosticCode::StrayCloser,
                    span,
                    "closing delimiter has no matching opener here",
                );
            }
            return;
        }
        let pairs = self
            .stack
            .last()
            .map(|frame| frame.closer == punct)
            .unwrap_or(false);
        if !pairs {
            // Stray or mismatched closer: report and skip, the stack is left
            // untouched so later closers can still pair.
            issues.emit(
                DiagnosticCode::StrayCloser,
                span,
                "closing delimiter has no matching opener here",
            );
            return;
        }
        if let Some(mut frame) = self.stack.pop() {
            frame.node.close = Some(span);
            if frame.pushed_context {
                self.contexts.pop();
            }
            self.attach(frame.node);
        }
    }

    fn attach(&mut self, node: StructureNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.node.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Type positions end at the first token that cannot continue a type.
    fn maybe_end_type_position(&mut self, token: &Token) {
        if self.contexts.last() != Some(&ContextKind::TypePosition) {
            return;
        }
        let ends = match token.category {
            TokenCategory::Punctuation(
                PunctuationKind::Semicolon
                | PunctuationKind::Comma
                | PunctuationKind::ParenClose
                | PunctuationKind::BraceOpen
                | PunctuationKind::BraceClose,
            ) => true,
            TokenCategory::Operator(op) => matches!(
                op,
                crate::token::OperatorKind::Assignment | crate::token::OperatorKind::Arrow
            ),
            _ => false,
        };
        if ends {
            self.contexts.pop();
        }
    }

    /// Keywords and symbols may announce a context. Immediate for type
    /// positions, deferred to the next `{` for block-like contexts.
    fn apply_push_context(&mut self, token: &Token) {
        // A contextual keyword demoted to identifier must not push; any
        // keyword-flavored resolution keeps the declared context.
        let declared = match token.category {
            TokenCategory::Keyword(_) => self
                .grammar
                .keyword(&token.lexeme)
                .and_then(|def| def.push_context),
            TokenCategory::Operator(_) => self
                .grammar
                .operator(&token.lexeme)
                .and_then(|def| def.push_context),
            TokenCategory::Punctuation(_) => self
                .grammar
                .punctuation(&token.lexeme)
                .and_then(|def| def.push_context),
            _ => None,
        };
        match declared {
            Some(ContextKind::TypePosition) => {
                if self.contexts.last() != Some(&ContextKind::TypePosition) {
                    self.contexts.push(ContextKind::TypePosition);
                }
            }
            Some(context) => self.pending = Some(context),
            None => {}
        }
    }
}
