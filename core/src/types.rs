//! Rule-tree type definitions for stylesheet modeling.
//!
//! This module defines the generic data model produced by [`parse`](crate::parse)
//! and consumed by [`serialize`](crate::serialize). The model understands rule
//! *structure* only (selectors, declaration lists, at-rule blocks); it never
//! interprets property values.

use serde::{Deserialize, Serialize};

/// A single `property: value` pair inside a declaration block.
///
/// # Examples
///
/// ```
/// use cmq_core::Declaration;
///
/// let decl = Declaration::new("color", "red !important");
/// assert_eq!(decl.property, "color");
/// assert_eq!(decl.value, "red !important");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Property name as written (e.g. `color`, `--gap`, `-webkit-transition`).
    pub property: String,
    /// Raw value text, including any `!important` suffix.
    pub value: String,
}

impl Declaration {
    /// Creates a declaration.
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// One entry of a declaration block.
///
/// Blocks keep comments and nested rules (`&:hover { ... }`, `@media`
/// inside a style rule, `@top-left` inside `@page`) in authored order next
/// to the declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockItem {
    Declaration(Declaration),
    Comment(Comment),
    Rule(Rule),
}

/// A style rule: a selector list followed by a declaration block.
///
/// # Examples
///
/// ```
/// use cmq_core::{Declaration, StyleRule};
///
/// let rule = StyleRule::new(["h1", "h2"]).with_declaration(Declaration::new("margin", "0"));
/// assert_eq!(rule.selectors, vec!["h1", "h2"]);
/// assert_eq!(rule.declarations().count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRule {
    /// Comma-separated selectors, split and whitespace-collapsed.
    pub selectors: Vec<String>,
    /// Block contents in authored order.
    pub items: Vec<BlockItem>,
}

impl StyleRule {
    /// Creates a style rule with the given selectors and an empty block.
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selectors: selectors.into_iter().map(Into::into).collect(),
            items: Vec::new(),
        }
    }

    /// Appends a declaration.
    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.items.push(BlockItem::Declaration(declaration));
        self
    }

    /// Iterates over the declarations of the block, skipping comments and
    /// nested rules.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.items.iter().filter_map(|item| match item {
            BlockItem::Declaration(declaration) => Some(declaration),
            _ => None,
        })
    }
}

/// A `/* ... */` comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Text between the comment delimiters, untrimmed.
    pub text: String,
}

/// An `@import` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRule {
    /// Everything after `@import` up to the terminating `;`, e.g.
    /// `url("base.css") screen`.
    pub url: String,
}

/// One frame of a `@keyframes` block (`from`, `to`, `50%`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Frame selectors, e.g. `["0%", "50%"]`.
    pub selectors: Vec<String>,
    pub items: Vec<BlockItem>,
}

/// Entry of a `@keyframes` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyframeItem {
    Frame(Keyframe),
    Comment(Comment),
}

/// A `@keyframes` (or vendor-prefixed `@-webkit-keyframes`) block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyframesRule {
    /// Animation name.
    pub name: String,
    /// Vendor prefix including both dashes (e.g. `-webkit-`), if any.
    pub vendor: Option<String>,
    pub frames: Vec<KeyframeItem>,
}

impl KeyframesRule {
    /// Returns the at-keyword without the leading `@`, e.g. `-moz-keyframes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmq_core::KeyframesRule;
    ///
    /// let rule = KeyframesRule { name: "spin".into(), vendor: Some("-webkit-".into()), frames: vec![] };
    /// assert_eq!(rule.keyword(), "-webkit-keyframes");
    /// ```
    pub fn keyword(&self) -> String {
        format!("{}keyframes", self.vendor.as_deref().unwrap_or_default())
    }
}

/// An `@media` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRule {
    /// Condition text (the prelude between `@media` and `{`), whitespace
    /// collapsed.
    pub condition: String,
    /// Nested rules in authored order.
    pub rules: Vec<Rule>,
}

/// Body shape of a generic at-rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "items")]
pub enum AtRuleBody {
    /// Statement at-rule terminated by `;` (`@charset`, `@namespace`).
    None,
    /// Declaration block (`@font-face`, `@page`), which may hold comments
    /// and nested at-rules such as page-margin boxes.
    Declarations(Vec<BlockItem>),
    /// Block of nested rules (`@supports`, `@layer`, `@container`).
    Rules(Vec<Rule>),
}

/// Any at-rule that is not `@media`, `@import` or `@keyframes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtRule {
    /// At-keyword without the `@`, lowercased (e.g. `font-face`).
    pub name: String,
    /// Prelude text, whitespace collapsed; may be empty.
    pub prelude: String,
    pub body: AtRuleBody,
}

/// A generic CSS construct.
///
/// # Examples
///
/// ```
/// use cmq_core::{MediaRule, Rule, StyleRule};
///
/// let media = Rule::Media(MediaRule {
///     condition: "(min-width: 768px)".into(),
///     rules: vec![Rule::Style(StyleRule::new([".a"]))],
/// });
/// assert!(media.is_media());
/// assert!(!Rule::Style(StyleRule::new([".b"])).is_media());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Rule {
    Style(StyleRule),
    Comment(Comment),
    Import(ImportRule),
    Keyframes(KeyframesRule),
    Media(MediaRule),
    AtRule(AtRule),
}

impl Rule {
    /// Returns `true` for `@media` blocks.
    pub fn is_media(&self) -> bool {
        matches!(self, Rule::Media(_))
    }

    /// Returns `true` for rules CSS requires before any other rule
    /// (`@charset` and `@import`).
    ///
    /// # Examples
    ///
    /// ```
    /// use cmq_core::{AtRule, AtRuleBody, ImportRule, Rule, StyleRule};
    ///
    /// assert!(Rule::Import(ImportRule { url: "'a.css'".into() }).is_leading());
    /// let charset = AtRule { name: "charset".into(), prelude: "\"utf-8\"".into(), body: AtRuleBody::None };
    /// assert!(Rule::AtRule(charset).is_leading());
    /// assert!(!Rule::Style(StyleRule::new(["a"])).is_leading());
    /// ```
    pub fn is_leading(&self) -> bool {
        match self {
            Rule::Import(_) => true,
            Rule::AtRule(at) => at.name == "charset",
            _ => false,
        }
    }
}

/// A parsed stylesheet: a flat, ordered list of top-level rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Creates a stylesheet from top-level rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Number of top-level `@media` rules.
    pub fn media_count(&self) -> usize {
        self.rules.iter().filter(|rule| rule.is_media()).count()
    }

    /// Returns `true` when the stylesheet has no rules at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_serializes_with_type_tag() {
        let rule = Rule::Media(MediaRule {
            condition: "print".to_string(),
            rules: vec![Rule::Style(
                StyleRule::new([".a"]).with_declaration(Declaration::new("color", "red")),
            )],
        });
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["type"], "media");
        assert_eq!(json["rules"][0]["type"], "style");
        assert_eq!(json["rules"][0]["items"][0]["declaration"]["property"], "color");

        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_block_items_keep_comments_and_nested_rules() {
        let mut rule = StyleRule::new([".card"]).with_declaration(Declaration::new("color", "red"));
        rule.items.push(BlockItem::Comment(Comment {
            text: " hover ".to_string(),
        }));
        rule.items.push(BlockItem::Rule(Rule::Style(
            StyleRule::new(["&:hover"]).with_declaration(Declaration::new("color", "blue")),
        )));

        let declarations: Vec<&str> = rule.declarations().map(|d| d.property.as_str()).collect();
        assert_eq!(declarations, vec!["color"]);

        let json = serde_json::to_value(Rule::Style(rule.clone())).unwrap();
        assert_eq!(json["items"][1]["comment"]["text"], " hover ");
        assert_eq!(json["items"][2]["rule"]["type"], "style");
        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, Rule::Style(rule));
    }

    #[test]
    fn test_stylesheet_media_count() {
        let sheet = Stylesheet::new(vec![
            Rule::Style(StyleRule::new(["a"])),
            Rule::Media(MediaRule {
                condition: "print".to_string(),
                rules: Vec::new(),
            }),
        ]);
        assert_eq!(sheet.media_count(), 1);
        assert!(!sheet.is_empty());
    }
}
