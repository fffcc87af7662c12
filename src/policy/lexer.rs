// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Token-level nom parsers for the `policy.conf` source language, and the error type the
//! statement grammar reports through.

use super::error::ParseError;

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_till, take_till1, take_while};
use nom::character::complete::{char, digit1, hex_digit1, multispace1, satisfy};
use nom::combinator::{cut, map, map_res, recognize, value, verify};
use nom::error::{context, ContextError, ErrorKind, FromExternalError, ParseError as NomParseError};
use nom::multi::many0_count;
use nom::sequence::{pair, preceded};
use nom::IResult;
use std::fmt;

pub(super) type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

/// Operators the grammar uses, longest first so that `found` reports `==` rather than `=`.
const PUNCTUATION: [&str; 16] =
    ["==", "!=", "&&", "||", "{", "}", "(", ")", ";", ":", ",", "*", "~", "-", "!", "^"];

#[derive(Clone, Debug, PartialEq)]
pub(super) enum SyntaxErrorKind {
    /// A bare nom failure with no better description.
    Nom(ErrorKind),
    Expected(&'static str),
    UnterminatedString,
    UnknownStatement(String),
    Constraint(&'static str),
    Invalid(String),
}

/// A grammar error positioned at the unparsed remainder of the policy text.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct SyntaxError<'a> {
    pub input: &'a str,
    pub kind: SyntaxErrorKind,
}

impl<'a> SyntaxError<'a> {
    pub fn new(input: &'a str, kind: SyntaxErrorKind) -> Self {
        Self { input, kind }
    }

    /// Bytes left after the offending position, ignoring leading whitespace and comments.
    fn remaining(&self) -> usize {
        skip_blank(self.input).len()
    }

    /// Converts into a [`ParseError`] whose line is the position of the error within `text`.
    pub fn into_parse_error(self, text: &str) -> ParseError {
        let rest = skip_blank(self.input);
        let line = line_at(text, rest);
        match self.kind {
            SyntaxErrorKind::UnterminatedString => ParseError::UnterminatedString { line },
            SyntaxErrorKind::UnknownStatement(keyword) => {
                ParseError::UnknownStatement { line, keyword }
            }
            SyntaxErrorKind::Constraint(reason) => {
                ParseError::InvalidConstraintExpression { line, reason }
            }
            SyntaxErrorKind::Invalid(message) => ParseError::InvalidStatement { line, message },
            SyntaxErrorKind::Expected(expected) => unexpected(line, rest, expected),
            SyntaxErrorKind::Nom(_) => unexpected(line, rest, "valid syntax"),
        }
    }
}

fn unexpected(line: usize, rest: &str, expected: &'static str) -> ParseError {
    let Some(c) = rest.chars().next() else {
        return ParseError::UnexpectedEnd { line, expected };
    };
    let found = if is_ident_start(c) {
        identifier(rest).map(|(_, word)| word).unwrap_or(rest)
    } else if c.is_ascii_digit() || c == '/' || c == '"' {
        rest.split(|c: char| c.is_whitespace() || c == ';').next().unwrap_or(rest)
    } else if let Some(p) = PUNCTUATION.iter().find(|p| rest.starts_with(**p)) {
        *p
    } else {
        return ParseError::InvalidCharacter { line, character: c };
    };
    ParseError::UnexpectedToken { line, expected, found: found.to_string() }
}

impl<'a> NomParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, SyntaxErrorKind::Nom(kind))
    }

    fn append(_: &'a str, _: ErrorKind, other: Self) -> Self {
        other
    }

    /// Keeps the alternative that got furthest; on a tie, the last one tried.
    fn or(self, other: Self) -> Self {
        if self.remaining() < other.remaining() {
            self
        } else {
            other
        }
    }
}

impl<'a> ContextError<&'a str> for SyntaxError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, other: Self) -> Self {
        match other.kind {
            SyntaxErrorKind::Nom(_) => Self::new(other.input, SyntaxErrorKind::Expected(ctx)),
            SyntaxErrorKind::Expected(_) if skip_blank(input).len() == other.remaining() => {
                Self::new(other.input, SyntaxErrorKind::Expected(ctx))
            }
            _ => other,
        }
    }
}

impl<'a, E: fmt::Display> FromExternalError<&'a str, E> for SyntaxError<'a> {
    fn from_external_error(input: &'a str, _: ErrorKind, e: E) -> Self {
        Self::new(input, SyntaxErrorKind::Invalid(e.to_string()))
    }
}

/// Wraps a rejected value as a non-recoverable error at `input`.
pub(super) fn invalid(input: &str, err: impl fmt::Display) -> nom::Err<SyntaxError<'_>> {
    nom::Err::Failure(SyntaxError::new(input, SyntaxErrorKind::Invalid(err.to_string())))
}

/// The 1-based line on which `rest`, a suffix of `text`, begins.
pub(super) fn line_at(text: &str, rest: &str) -> usize {
    let offset = text.len().saturating_sub(rest.len());
    text.get(..offset).map_or(0, |consumed| consumed.matches('\n').count()) + 1
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

/// Skips whitespace and `#` comments.
pub(super) fn blank(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0_count(alt((multispace1, recognize(pair(char('#'), take_till(|c: char| c == '\n')))))),
    )(input)
}

fn skip_blank(input: &str) -> &str {
    blank(input).map_or(input, |(rest, _)| rest)
}

/// Runs `parser` after any whitespace and comments.
pub(super) fn spaced<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: nom::Parser<&'a str, O, SyntaxError<'a>>,
{
    preceded(blank, parser)
}

/// A name: `[A-Za-z_$][A-Za-z0-9_.$]*`. Keywords are identifiers too.
pub(super) fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_continue)))(input)
}

pub(super) fn ident<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, String> {
    context(expected, map(spaced(identifier), String::from))
}

/// An identifier equal to `kw`; `dom` does not match the start of `domby`.
pub(super) fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    context(kw, verify(spaced(identifier), move |word: &str| word == kw))
}

pub(super) fn punct<'a>(p: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    context(p, spaced(tag(p)))
}

/// A decimal or `0x`-prefixed hexadecimal number.
pub(super) fn number(input: &str) -> PResult<'_, u64> {
    context(
        "number",
        spaced(alt((
            preceded(
                tag_no_case("0x"),
                cut(map_res(hex_digit1, |hex: &str| u64::from_str_radix(hex, 16))),
            ),
            map_res(digit1, |digits: &str| digits.parse::<u64>()),
        ))),
    )(input)
}

/// The contents of a `"..."` literal, which may not span lines.
pub(super) fn quoted(input: &str) -> PResult<'_, String> {
    let (rest, _) = blank(input)?;
    let (body, _) = context("string", char::<_, SyntaxError<'_>>('"'))(rest)?;
    let (after, contents) =
        take_till::<_, _, SyntaxError<'_>>(|c: char| c == '"' || c == '\n')(body)?;
    match char::<_, SyntaxError<'_>>('"')(after) {
        Ok((after, _)) => Ok((after, contents.to_string())),
        Err(_) => Err(nom::Err::Failure(SyntaxError::new(rest, SyntaxErrorKind::UnterminatedString))),
    }
}

/// A file system path, beginning with `/`.
pub(super) fn path(input: &str) -> PResult<'_, String> {
    context(
        "path",
        map(
            spaced(recognize(pair(
                char('/'),
                take_till(|c: char| c.is_whitespace() || c == ';' || c == '"'),
            ))),
            String::from,
        ),
    )(input)
}

/// The next whitespace-delimited word verbatim, for values such as network addresses whose
/// syntax does not fit the token grammar.
pub(super) fn raw_word<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, String> {
    context(
        expected,
        map(spaced(take_till1(|c: char| c.is_whitespace() || c == ';')), String::from),
    )
}
