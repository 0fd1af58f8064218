//! Structural match patterns.
//!
//! Pattern alternatives, tightest binding first: literal, wildcard,
//! `*name` star, value (dotted name), class with pattern arguments,
//! capture, sequence (bracketed or parenthesized), mapping. Or-patterns
//! (`p | q`) sit on top. A bare name is a capture only when neither a dot
//! nor a call follows; choice order makes that deterministic.

use crate::plume::ast::nodes::{Expr, Node, Pattern};
use crate::plume::ast::range::Range;
use crate::plume::diagnostics::{Diagnostic, DiagnosticKind};
use crate::plume::parsing::engine::{Failure, PResult, Parser};
use crate::plume::parsing::graph::RuleId;
use crate::plume::token::TokenKind;

fn pattern_node(p: Pattern) -> Node {
    Node::Pattern(p)
}

pub fn pattern(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::Pattern, at, or_pattern)
}

fn or_pattern(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::OrPattern, at, |p, at| {
        let (first, mut i) = closed_pattern(p, at).map(|(n, i)| (n.into_pattern(), i))?;
        if !p.tok(i).is_op("|") {
            return Ok((pattern_node(first), i));
        }
        let mut alternatives = vec![first];
        while p.tok(i).is_op("|") {
            let (next, j) = closed_pattern(p, i + 1).map(|(n, j)| (n.into_pattern(), j))?;
            alternatives.push(next);
            i = j;
        }
        let range = alternatives
            .first()
            .expect("nonempty")
            .range()
            .cover(alternatives.last().expect("nonempty").range());
        Ok((pattern_node(Pattern::Or { alternatives, range }), i))
    })
}

fn closed_pattern(p: &mut Parser, at: usize) -> PResult {
    p.memoized(RuleId::ClosedPattern, at, |p, at| {
        let token = p.tok(at).clone();
        match token.kind {
            TokenKind::Number | TokenKind::Str => Ok((
                pattern_node(Pattern::Literal {
                    text: token.text,
                    range: token.range,
                }),
                at + 1,
            )),
            TokenKind::Op if token.text == "-" && p.kind(at + 1) == TokenKind::Number => {
                let number = p.tok(at + 1).clone();
                let range = token.range.cover(&number.range);
                Ok((
                    pattern_node(Pattern::Literal {
                        text: format!("-{}", number.text),
                        range,
                    }),
                    at + 2,
                ))
            }
            TokenKind::Op if token.text == "*" => {
                let (name, name_range, i) = p.expect_name(at + 1)?;
                let range = token.range.cover(&name_range);
                Ok((pattern_node(Pattern::Star { name, range }), i))
            }
            TokenKind::Name if token.text == "_" => Ok((
                pattern_node(Pattern::Wildcard { range: token.range }),
                at + 1,
            )),
            TokenKind::Name if matches!(token.text.as_str(), "True" | "False" | "None") => Ok((
                pattern_node(Pattern::Literal {
                    text: token.text,
                    range: token.range,
                }),
                at + 1,
            )),
            TokenKind::Name => name_pattern(p, at),
            TokenKind::OpenBracket => sequence_pattern(p, at, TokenKind::CloseBracket),
            TokenKind::OpenParen => sequence_pattern(p, at, TokenKind::CloseParen),
            TokenKind::OpenBrace => mapping_pattern(p, at),
            _ => Err(p.fail(at, "a pattern")),
        }
    })
}

/// Name-led patterns: capture, dotted value, or class.
fn name_pattern(p: &mut Parser, at: usize) -> PResult {
    let (first, first_range, mut i) = p.expect_name(at)?;
    let mut path = first;
    let mut range = first_range.clone();
    let mut dotted = false;
    while p.kind(i) == TokenKind::Dot {
        let (part, part_range, j) = p.expect_name(i + 1)?;
        path.push('.');
        path.push_str(&part);
        range = range.cover(&part_range);
        i = j;
        dotted = true;
    }
    if p.kind(i) == TokenKind::OpenParen {
        return class_pattern(p, i + 1, path, range);
    }
    if dotted {
        return Ok((pattern_node(Pattern::Value { path, range }), i));
    }
    Ok((
        pattern_node(Pattern::Capture {
            name: path,
            range,
        }),
        i,
    ))
}

fn class_pattern(p: &mut Parser, mut at: usize, path: String, start: Range) -> PResult {
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    while p.kind(at) != TokenKind::CloseParen {
        if p.kind(at) == TokenKind::Name && p.tok(at + 1).is_op("=") {
            let name = p.tok(at).text.clone();
            let (value, j) = pattern(p, at + 2).map(|(n, j)| (n.into_pattern(), j))?;
            kwargs.push((name, value));
            at = j;
        } else {
            let (value, j) = pattern(p, at).map(|(n, j)| (n.into_pattern(), j))?;
            if !kwargs.is_empty() {
                let diag = Diagnostic::point(
                    DiagnosticKind::Grammar,
                    "positional pattern follows keyword pattern",
                    value.range(),
                    p.loc,
                );
                return Err(p.fatal(diag));
            }
            args.push(value);
            at = j;
        }
        if p.kind(at) == TokenKind::Comma {
            at += 1;
        } else {
            break;
        }
    }
    let at = p.expect_kind(at, TokenKind::CloseParen, "')'")?;
    let range = start.cover(&p.tok(at - 1).range.clone());
    Ok((
        pattern_node(Pattern::Class {
            path,
            args,
            kwargs,
            range,
        }),
        at,
    ))
}

fn sequence_pattern(p: &mut Parser, at: usize, close: TokenKind) -> PResult {
    let open = p.tok(at).range.clone();
    let mut i = at + 1;
    let mut items = Vec::new();
    let mut star = None;
    while p.kind(i) != close {
        let (item, j) = pattern(p, i).map(|(n, j)| (n.into_pattern(), j))?;
        if matches!(item, Pattern::Star { .. }) {
            if star.is_some() {
                let diag = Diagnostic::point(
                    DiagnosticKind::Grammar,
                    "multiple starred subpatterns in one sequence pattern",
                    item.range(),
                    p.loc,
                );
                return Err(p.fatal(diag));
            }
            star = Some(items.len());
        }
        items.push(item);
        if p.kind(j) == TokenKind::Comma {
            i = j + 1;
        } else {
            i = j;
            break;
        }
    }
    let i = p.expect_kind(i, close, "a closing delimiter")?;
    let range = open.cover(&p.tok(i - 1).range.clone());
    Ok((
        pattern_node(Pattern::Sequence { items, star, range }),
        i,
    ))
}

fn mapping_pattern(p: &mut Parser, at: usize) -> PResult {
    let open = p.tok(at).range.clone();
    let mut i = at + 1;
    let mut pairs = Vec::new();
    while p.kind(i) != TokenKind::CloseBrace {
        let key_token = p.tok(i).clone();
        let key = match key_token.kind {
            TokenKind::Number | TokenKind::Str => {
                i += 1;
                Expr::Literal {
                    text: key_token.text,
                    range: key_token.range,
                }
            }
            TokenKind::Name => {
                // Dotted value keys only; bare names are not constants.
                let (path, range, j) = dotted_key(p, i)?;
                i = j;
                Expr::Name { text: path, range }
            }
            _ => return Err(p.fail(i, "a mapping pattern key")),
        };
        let j = p.expect_kind(i, TokenKind::Colon, "':'")?;
        let (value, j) = pattern(p, j).map(|(n, j)| (n.into_pattern(), j))?;
        pairs.push((key, value));
        if p.kind(j) == TokenKind::Comma {
            i = j + 1;
        } else {
            i = j;
            break;
        }
    }
    let i = p.expect_kind(i, TokenKind::CloseBrace, "'}'")?;
    let range = open.cover(&p.tok(i - 1).range.clone());
    Ok((pattern_node(Pattern::Mapping { pairs, range }), i))
}

fn dotted_key(p: &mut Parser, at: usize) -> Result<(String, Range, usize), Failure> {
    let (first, range, mut i) = p.expect_name(at)?;
    let mut path = first;
    let mut range = range;
    let mut dotted = false;
    while p.kind(i) == TokenKind::Dot {
        let (part, part_range, j) = p.expect_name(i + 1)?;
        path.push('.');
        path.push_str(&part);
        range = range.cover(&part_range);
        i = j;
        dotted = true;
    }
    if !dotted {
        return Err(p.fail(at, "a dotted value key"));
    }
    Ok((path, range, i))
}
