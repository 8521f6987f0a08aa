//! Structural stylesheet parser.
//!
//! Built on the `cssparser` tokenizer. Rule lists, declaration blocks and
//! preludes are walked token by token with comments included, so comments
//! survive anywhere they may appear and `;`, `{` and `}` inside strings,
//! urls and brackets never end a construct. Blocks that the tokenizer closes
//! implicitly at end of input are reported as errors instead of accepted.

use std::ops::Range;

use cssparser::{
    Delimiter, ParseError as CssParseError, ParseErrorKind as CssErrorKind, Parser, ParserInput,
    ParserState, SourceLocation, SourcePosition, Token,
};

use crate::error::{ParseError, ParseErrorKind, Result};
use crate::types::{
    AtRule, AtRuleBody, BlockItem, Comment, Declaration, ImportRule, Keyframe, KeyframeItem,
    KeyframesRule, MediaRule, Rule, StyleRule, Stylesheet,
};

/// At-rules whose block holds nested rules rather than declarations.
const RULE_BLOCK_AT_RULES: &[&str] = &[
    "supports",
    "document",
    "layer",
    "container",
    "scope",
    "starting-style",
];

/// Parses stylesheet text into a flat top-level rule list.
///
/// # Errors
///
/// Returns the first structural problem as a [`ParseError`]; no partial tree
/// is ever returned.
///
/// # Examples
///
/// ```
/// use cmq_core::{Rule, parse};
///
/// let sheet = parse(".a { color: red } @media (min-width: 500px) { .b { color: blue } }").unwrap();
/// assert_eq!(sheet.rules.len(), 2);
/// let Rule::Media(media) = &sheet.rules[1] else { panic!("expected media") };
/// assert_eq!(media.condition, "(min-width: 500px)");
/// assert_eq!(media.rules.len(), 1);
/// ```
pub fn parse(source: &str) -> Result<Stylesheet> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    parse_rule_list(&mut parser).map(Stylesheet::new)
}

/// Collapses runs of whitespace outside quoted strings to a single space and
/// trims both ends.
///
/// # Examples
///
/// ```
/// use cmq_core::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("  screen and\n  (min-width:  500px) "), "screen and (min-width: 500px)");
/// assert_eq!(collapse_whitespace(r#"a[title="x  y"]"#), r#"a[title="x  y"]"#);
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for ch in text.trim().chars() {
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
    }

    out
}

fn parse_rule_list<'i>(input: &mut Parser<'i, '_>) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();

    loop {
        let start = input.state();
        let Ok(token) = input.next_including_whitespace_and_comments() else {
            return Ok(rules);
        };

        match token.clone() {
            Token::WhiteSpace(_) | Token::Semicolon | Token::CDO | Token::CDC => {}
            Token::Comment(text) => rules.push(Rule::Comment(read_comment(input, &start, text)?)),
            Token::AtKeyword(name) => rules.push(parse_at_rule(input, &start, &name)?),
            Token::Delim('@') => {
                return Err(ParseError::at(
                    ParseErrorKind::MissingAtRuleName,
                    start.source_location(),
                ));
            }
            Token::CloseCurlyBracket => {
                return Err(ParseError::at(
                    ParseErrorKind::UnexpectedCloseBrace,
                    start.source_location(),
                ));
            }
            _ => {
                input.reset(&start);
                rules.push(Rule::Style(parse_style_rule(input)?));
            }
        }
    }
}

fn parse_style_rule<'i>(input: &mut Parser<'i, '_>) -> Result<StyleRule> {
    let start = input.state();
    let selectors = read_selectors(input)?;
    expect_block(input, &start)?;
    let items = parse_block(input, start.source_location(), |block| {
        parse_block_items(block)
    })?;
    Ok(StyleRule { selectors, items })
}

fn parse_at_rule<'i>(input: &mut Parser<'i, '_>, start: &ParserState, name: &str) -> Result<Rule> {
    let name = name.to_ascii_lowercase();
    let prelude = collapse_whitespace(read_prelude(input)?);

    let has_block = matches!(
        input.next_including_whitespace_and_comments(),
        Ok(Token::CurlyBracketBlock)
    );
    if !has_block {
        return Ok(if name == "import" {
            Rule::Import(ImportRule { url: prelude })
        } else {
            Rule::AtRule(AtRule {
                name,
                prelude,
                body: AtRuleBody::None,
            })
        });
    }

    let open = start.source_location();

    if name == "media" {
        let rules = parse_block(input, open, |block| parse_rule_list(block))?;
        return Ok(Rule::Media(MediaRule {
            condition: prelude,
            rules,
        }));
    }

    if let Some(vendor) = keyframes_vendor(&name) {
        let frames = parse_block(input, open, |block| parse_keyframe_list(block))?;
        return Ok(Rule::Keyframes(KeyframesRule {
            name: prelude,
            vendor,
            frames,
        }));
    }

    let body = if RULE_BLOCK_AT_RULES.contains(&strip_vendor(&name)) {
        AtRuleBody::Rules(parse_block(input, open, |block| parse_rule_list(block))?)
    } else {
        AtRuleBody::Declarations(parse_block(input, open, |block| parse_block_items(block))?)
    };
    Ok(Rule::AtRule(AtRule {
        name,
        prelude,
        body,
    }))
}

fn parse_keyframe_list<'i>(input: &mut Parser<'i, '_>) -> Result<Vec<KeyframeItem>> {
    let mut frames = Vec::new();

    loop {
        let start = input.state();
        let Ok(token) = input.next_including_whitespace_and_comments() else {
            return Ok(frames);
        };

        match token.clone() {
            Token::WhiteSpace(_) | Token::Semicolon => {}
            Token::Comment(text) => {
                frames.push(KeyframeItem::Comment(read_comment(input, &start, text)?));
            }
            _ => {
                input.reset(&start);
                let selectors = read_selectors(input)?;
                expect_block(input, &start)?;
                let items = parse_block(input, start.source_location(), |block| {
                    parse_block_items(block)
                })?;
                frames.push(KeyframeItem::Frame(Keyframe { selectors, items }));
            }
        }
    }
}

/// Declarations, comments and nested rules of one `{ ... }` block.
fn parse_block_items<'i>(input: &mut Parser<'i, '_>) -> Result<Vec<BlockItem>> {
    let mut items = Vec::new();

    loop {
        let start = input.state();
        let Ok(token) = input.next_including_whitespace_and_comments() else {
            return Ok(items);
        };

        match token.clone() {
            Token::WhiteSpace(_) | Token::Semicolon => {}
            Token::Comment(text) => {
                items.push(BlockItem::Comment(read_comment(input, &start, text)?));
            }
            Token::AtKeyword(name) => {
                items.push(BlockItem::Rule(parse_at_rule(input, &start, &name)?));
            }
            _ => {
                input.reset(&start);
                items.push(parse_declaration_or_rule(input)?);
            }
        }
    }
}

/// `property: value` up to `;`, or a nested style rule when a `{` block
/// comes first (`&:hover { ... }`).
fn parse_declaration_or_rule<'i>(input: &mut Parser<'i, '_>) -> Result<BlockItem> {
    let start = input.state();
    let text = read_prelude(input)?;

    if matches!(
        input.next_including_whitespace_and_comments(),
        Ok(Token::CurlyBracketBlock)
    ) {
        input.reset(&start);
        return parse_style_rule(input).map(|rule| BlockItem::Rule(Rule::Style(rule)));
    }

    split_declaration(text)
        .map(BlockItem::Declaration)
        .ok_or_else(|| {
            ParseError::at(
                ParseErrorKind::MissingColon(collapse_whitespace(text)),
                start.source_location(),
            )
        })
}

/// Consumes a selector list up to (not including) the next `{` or `;`.
fn read_selectors<'i>(input: &mut Parser<'i, '_>) -> Result<Vec<String>> {
    let start = input.position();
    let commas = read_until_block(input)?;
    let end = input.position();

    let mut selectors = Vec::with_capacity(commas.len() + 1);
    let mut from = start;
    for comma in commas {
        selectors.push(input.slice(from..comma.start));
        from = comma.end;
    }
    selectors.push(input.slice(from..end));

    Ok(selectors
        .into_iter()
        .map(collapse_whitespace)
        .filter(|selector| !selector.is_empty())
        .collect())
}

/// Consumes a prelude up to (not including) the next `{` or `;` and returns
/// its raw text.
fn read_prelude<'i>(input: &mut Parser<'i, '_>) -> Result<&'i str> {
    let start = input.position();
    read_until_block(input)?;
    Ok(input.slice_from(start))
}

fn read_until_block<'i>(input: &mut Parser<'i, '_>) -> Result<Vec<Range<SourcePosition>>> {
    input
        .parse_until_before(Delimiter::CurlyBracketBlock | Delimiter::Semicolon, |prelude| {
            let result = scan_values(prelude);
            result.map_err(|error| lift(error, prelude.current_source_location()))
        })
        .map_err(into_parse_error)
}

/// Validates every remaining token of `input`, descending into brackets, and
/// returns the span of each top-level comma.
fn scan_values<'i>(input: &mut Parser<'i, '_>) -> Result<Vec<Range<SourcePosition>>> {
    let mut commas = Vec::new();

    loop {
        let start = input.state();
        let Ok(token) = input.next_including_whitespace_and_comments() else {
            return Ok(commas);
        };

        match token.clone() {
            Token::Comma => commas.push(start.position()..input.position()),
            Token::Comment(text) => {
                read_comment(input, &start, text)?;
            }
            Token::QuotedString(_) => {
                if !string_is_closed(input.slice_from(start.position())) {
                    return Err(ParseError::at(
                        ParseErrorKind::UnterminatedString,
                        start.source_location(),
                    ));
                }
            }
            Token::BadString(_) => {
                return Err(ParseError::at(
                    ParseErrorKind::UnterminatedString,
                    start.source_location(),
                ));
            }
            Token::CloseCurlyBracket => {
                return Err(ParseError::at(
                    ParseErrorKind::UnexpectedCloseBrace,
                    start.source_location(),
                ));
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                parse_block(input, start.source_location(), |block| {
                    scan_values(block).map(|_| ())
                })?;
            }
            _ => {}
        }
    }
}

fn expect_block(input: &mut Parser<'_, '_>, start: &ParserState) -> Result<()> {
    let prelude = input.slice_from(start.position());
    match input.next_including_whitespace_and_comments() {
        Ok(Token::CurlyBracketBlock) => Ok(()),
        _ => Err(ParseError::at(
            ParseErrorKind::MissingBlock(collapse_whitespace(prelude)),
            start.source_location(),
        )),
    }
}

/// Parses the contents of the block whose opening token was just consumed.
///
/// The tokenizer closes blocks silently at end of input; when no closing
/// token followed the contents the block is reported as unterminated at
/// `open`.
fn parse_block<'i, T, F>(input: &mut Parser<'i, '_>, open: SourceLocation, parse: F) -> Result<T>
where
    F: for<'tt> FnOnce(&mut Parser<'i, 'tt>) -> Result<T>,
{
    let mut end = None;
    let value = input
        .parse_nested_block(|block| {
            let result = parse(block);
            end = Some(block.position());
            result.map_err(|error| lift(error, block.current_source_location()))
        })
        .map_err(into_parse_error)?;

    if end == Some(input.position()) {
        return Err(ParseError::at(ParseErrorKind::UnterminatedBlock, open));
    }
    Ok(value)
}

fn read_comment(input: &Parser<'_, '_>, start: &ParserState, text: &str) -> Result<Comment> {
    let raw = input.slice_from(start.position());
    if raw.len() < 4 || !raw.ends_with("*/") {
        return Err(ParseError::at(
            ParseErrorKind::UnterminatedComment,
            start.source_location(),
        ));
    }
    Ok(Comment {
        text: text.to_string(),
    })
}

/// Whether a quoted-string token's source text ends with its own unescaped
/// quote.
fn string_is_closed(raw: &str) -> bool {
    let Some(quote) = raw.chars().next() else {
        return false;
    };
    let Some(inner) = raw[quote.len_utf8()..].strip_suffix(quote) else {
        return false;
    };
    inner.chars().rev().take_while(|&ch| ch == '\\').count() % 2 == 0
}

fn lift<'i>(error: ParseError, location: SourceLocation) -> CssParseError<'i, ParseError> {
    CssParseError {
        kind: CssErrorKind::Custom(error),
        location,
    }
}

fn into_parse_error(error: CssParseError<'_, ParseError>) -> ParseError {
    match error.kind {
        CssErrorKind::Custom(error) => error,
        CssErrorKind::Basic(kind) => ParseError::at(kind.into(), error.location),
    }
}


/// `Some(vendor)` when `name` is a (possibly prefixed) keyframes keyword.
fn keyframes_vendor(name: &str) -> Option<Option<String>> {
    if name == "keyframes" {
        return Some(None);
    }
    let prefix = name.strip_suffix("keyframes")?;
    (prefix.len() > 2 && prefix.starts_with('-') && prefix.ends_with('-'))
        .then(|| Some(prefix.to_string()))
}

fn strip_vendor(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('-') {
        if let Some((_, unprefixed)) = rest.split_once('-') {
            return unprefixed;
        }
    }
    name
}

fn split_declaration(text: &str) -> Option<Declaration> {
    let (property, value) = text.split_once(':')?;
    let property = property.trim();
    if property.is_empty() {
        return None;
    }
    Some(Declaration::new(property, value.trim()))
}
