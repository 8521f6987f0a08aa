//! Stylesheet serialization.
//!
//! Output is a fixed point of [`parse`](crate::parse) followed by
//! [`serialize`]: re-parsing serialized text and serializing it again yields
//! the same bytes.

use serde::{Deserialize, Serialize};

use crate::types::{
    AtRule, AtRuleBody, BlockItem, Comment, KeyframeItem, KeyframesRule, Rule, StyleRule,
    Stylesheet,
};

/// Line terminator used in serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// Formatting knobs for [`serialize`].
///
/// # Examples
///
/// ```
/// use cmq_core::{LineEnding, SerializeOptions};
///
/// let options = SerializeOptions::default();
/// assert_eq!(options.indent, "  ");
/// assert_eq!(options.line_ending, LineEnding::Lf);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    /// Indentation unit for each nesting level.
    pub indent: String,
    pub line_ending: LineEnding,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            line_ending: LineEnding::Lf,
        }
    }
}

/// Serializes a stylesheet to CSS text.
///
/// Top-level rules are separated by a blank line; nested rules are indented
/// one level per block. An empty stylesheet serializes to an empty string.
///
/// # Examples
///
/// ```
/// use cmq_core::{SerializeOptions, parse, serialize};
///
/// let sheet = parse("@media print{.a{color:red}}").unwrap();
/// assert_eq!(
///     serialize(&sheet, &SerializeOptions::default()),
///     "@media print {\n  .a {\n    color: red;\n  }\n}\n"
/// );
/// ```
pub fn serialize(sheet: &Stylesheet, options: &SerializeOptions) -> String {
    let mut writer = Writer {
        out: String::new(),
        options,
    };
    for (index, rule) in sheet.rules.iter().enumerate() {
        if index > 0 {
            writer.newline();
        }
        writer.rule(rule, 0);
    }
    writer.out
}

struct Writer<'a> {
    out: String,
    options: &'a SerializeOptions,
}

impl Writer<'_> {
    fn newline(&mut self) {
        self.out.push_str(self.options.line_ending.as_str());
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent);
        }
        self.out.push_str(text);
        self.newline();
    }

    fn rule(&mut self, rule: &Rule, depth: usize) {
        match rule {
            Rule::Style(style) => self.style(style, depth),
            Rule::Comment(comment) => self.comment(comment, depth),
            Rule::Import(import) => self.line(depth, &format!("@import {};", import.url)),
            Rule::Keyframes(keyframes) => self.keyframes(keyframes, depth),
            Rule::Media(media) => {
                self.rule_block(&format!("@media {}", media.condition), &media.rules, depth);
            }
            Rule::AtRule(at_rule) => self.at_rule(at_rule, depth),
        }
    }

    fn comment(&mut self, comment: &Comment, depth: usize) {
        self.line(depth, &format!("/*{}*/", comment.text));
    }

    fn style(&mut self, style: &StyleRule, depth: usize) {
        self.item_block(&style.selectors.join(", "), &style.items, depth);
    }

    fn item_block(&mut self, header: &str, items: &[BlockItem], depth: usize) {
        if items.is_empty() {
            self.line(depth, &format!("{header} {{}}"));
            return;
        }
        self.line(depth, &format!("{header} {{"));
        for item in items {
            match item {
                BlockItem::Declaration(declaration) => self.line(
                    depth + 1,
                    &format!("{}: {};", declaration.property, declaration.value),
                ),
                BlockItem::Comment(comment) => self.comment(comment, depth + 1),
                BlockItem::Rule(rule) => self.rule(rule, depth + 1),
            }
        }
        self.line(depth, "}");
    }

    fn rule_block(&mut self, header: &str, rules: &[Rule], depth: usize) {
        if rules.is_empty() {
            self.line(depth, &format!("{header} {{}}"));
            return;
        }
        self.line(depth, &format!("{header} {{"));
        for rule in rules {
            self.rule(rule, depth + 1);
        }
        self.line(depth, "}");
    }

    fn keyframes(&mut self, keyframes: &KeyframesRule, depth: usize) {
        let header = format!("@{} {}", keyframes.keyword(), keyframes.name);
        if keyframes.frames.is_empty() {
            self.line(depth, &format!("{header} {{}}"));
            return;
        }
        self.line(depth, &format!("{header} {{"));
        for item in &keyframes.frames {
            match item {
                KeyframeItem::Frame(frame) => {
                    self.item_block(&frame.selectors.join(", "), &frame.items, depth + 1);
                }
                KeyframeItem::Comment(comment) => self.comment(comment, depth + 1),
            }
        }
        self.line(depth, "}");
    }

    fn at_rule(&mut self, at_rule: &AtRule, depth: usize) {
        let header = if at_rule.prelude.is_empty() {
            format!("@{}", at_rule.name)
        } else {
            format!("@{} {}", at_rule.name, at_rule.prelude)
        };
        match &at_rule.body {
            AtRuleBody::None => self.line(depth, &format!("{header};")),
            AtRuleBody::Declarations(items) => self.item_block(&header, items, depth),
            AtRuleBody::Rules(rules) => self.rule_block(&header, rules, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const SAMPLE: &str = r#"@charset "utf-8";
@import url("base.css") screen;
/* layout */
.a, .b{color:red;/* bg */background:url(x.png)}
.card{color:red;&:hover{color:blue}}
@font-face{font-family:Foo;src:url(foo.woff)}
@page :first{margin:1in;@top-left{content:"x"}}
@-webkit-keyframes pulse{0%{opacity:0}100%{opacity:1}}
@supports (display:grid){.grid{display:grid}}
@media screen and (min-width:768px){.a{color:blue}.empty{}}
"#;

    #[test]
    fn test_serialize_is_a_fixed_point() {
        let options = SerializeOptions::default();
        let first = serialize(&parse(SAMPLE).unwrap(), &options);
        let second = serialize(&parse(&first).unwrap(), &options);
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialize_round_trips_tree() {
        let sheet = parse(SAMPLE).unwrap();
        let text = serialize(&sheet, &SerializeOptions::default());
        assert_eq!(parse(&text).unwrap(), sheet);
    }

    #[test]
    fn test_serialize_layout() {
        let sheet = parse(".a{color:red}@media print{.b{x:y}}").unwrap();
        let text = serialize(&sheet, &SerializeOptions::default());
        assert_eq!(
            text,
            ".a {\n  color: red;\n}\n\n@media print {\n  .b {\n    x: y;\n  }\n}\n"
        );
    }

    #[test]
    fn test_serialize_crlf_and_tab_indent() {
        let sheet = parse(".a{color:red}").unwrap();
        let options = SerializeOptions {
            indent: "\t".to_string(),
            line_ending: LineEnding::Crlf,
        };
        assert_eq!(serialize(&sheet, &options), ".a {\r\n\tcolor: red;\r\n}\r\n");
    }

    #[test]
    fn test_serialize_statements_and_keyframes() {
        let sheet = parse(SAMPLE).unwrap();
        let text = serialize(&sheet, &SerializeOptions::default());
        assert!(text.starts_with("@charset \"utf-8\";\n\n@import url(\"base.css\") screen;\n"));
        assert!(text.contains("@-webkit-keyframes pulse {\n  0% {\n    opacity: 0;\n  }\n"));
        assert!(text.contains("  .empty {}\n"));
    }

    #[test]
    fn test_serialize_block_comments_and_nested_rules() {
        let sheet = parse(".a { color: red; /* keep me */ &:hover { color: blue } }").unwrap();
        assert_eq!(
            serialize(&sheet, &SerializeOptions::default()),
            ".a {\n  color: red;\n  /* keep me */\n  &:hover {\n    color: blue;\n  }\n}\n"
        );

        let sheet = parse("@page :first { margin: 1in; @top-left { content: \"x\" } }").unwrap();
        assert_eq!(
            serialize(&sheet, &SerializeOptions::default()),
            "@page :first {\n  margin: 1in;\n  @top-left {\n    content: \"x\";\n  }\n}\n"
        );
    }

    #[test]
    fn test_serialize_empty_stylesheet() {
        assert_eq!(serialize(&Stylesheet::default(), &SerializeOptions::default()), "");
    }
}
