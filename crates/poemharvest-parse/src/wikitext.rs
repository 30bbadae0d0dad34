// Wiki markup parsing.
//
// Turns raw MediaWiki markup into a `Wikicode` node tree: templates, tags,
// wiki links, external links, comments, and plain text. Parsing is
// best-effort: an unterminated construct is kept as literal text and
// parsing never fails.

use poemharvest_model::marker;
use regex::Regex;
use std::collections::HashSet;
use std::iter;
use std::sync::LazyLock;

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([A-Za-z][A-Za-z0-9]*)((?:\s[^<>]*?)?)\s*(/?)>").expect("valid tag regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("valid attribute regex")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]{2,8});").expect("valid entity regex")
});

/// Tags that never have contents.
const VOID_TAGS: &[&str] = &["br", "hr", "wbr"];

/// Tags whose contents are kept verbatim instead of being parsed.
const RAW_TAGS: &[&str] = &["nowiki", "pre", "math", "score", "syntaxhighlight", "source"];

const URL_SCHEMES: &[&str] = &["http://", "https://", "ftp://", "mailto:", "//"];

/// Constructs nested deeper than this are read as literal text.
const MAX_NESTING: usize = 128;

/// A sequence of markup nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wikicode {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    /// `<!-- ... -->`
    Comment(String),
    Template(Template),
    Tag(Tag),
    WikiLink(WikiLink),
    ExternalLink(ExternalLink),
    /// A run of two or more apostrophes (italic/bold toggle).
    Style(usize),
    /// A numbered footnote marker inserted in place of a footnote reference.
    FootnoteMarker(u32),
}

/// `{{name|positional|key=value}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: Wikicode,
    pub params: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Trimmed plain-text name; positional parameters are named "1", "2", ...
    pub name: String,
    pub value: Wikicode,
    /// Whether the name was written out (`key=value`) rather than implied.
    pub showkey: bool,
}

/// An HTML-style or extension tag such as `<poem>`, `<ref>`, or `<br/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name.
    pub name: String,
    /// Raw attribute text, trimmed.
    pub attrs: String,
    /// `None` for self-closing and void tags.
    pub contents: Option<Wikicode>,
}

/// `[[target]]` or `[[target|text]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: Wikicode,
    pub text: Option<Wikicode>,
}

/// `[url]` or `[url title]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLink {
    pub url: String,
    pub title: Option<Wikicode>,
}

/// Parse raw markup into a node tree.
pub fn parse(input: &str) -> Wikicode {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
        failed: HashSet::new(),
    };
    parser.parse_until(&Context::Top).unwrap_or_default()
}

impl Wikicode {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Render to plain text, dropping all markup.
    pub fn strip_code(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        for node in &self.nodes {
            node.write_plain(out);
        }
    }

    /// Visit every node in document order, descending into all children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        for node in &self.nodes {
            visit(node);
            for child in node.children() {
                child.walk(visit);
            }
        }
    }

    /// Every template in the tree, nested ones included, in document order.
    pub fn templates(&self) -> Vec<&Template> {
        let mut found = Vec::new();
        self.walk(&mut |node| {
            if let Node::Template(t) = node {
                found.push(t);
            }
        });
        found
    }

    /// Every tag named `name` (case-insensitive), in document order.
    pub fn tags_named(&self, name: &str) -> Vec<&Tag> {
        let mut found = Vec::new();
        self.walk(&mut |node| {
            if let Node::Tag(t) = node {
                if t.is(name) {
                    found.push(t);
                }
            }
        });
        found
    }

    /// Rebuild the tree, replacing every node for which `f` returns a
    /// replacement (possibly empty).
    ///
    /// A replaced node's own subtree is not visited; every other node has its
    /// children rewritten the same way. Nodes are offered to `f` in document
    /// order.
    pub fn rewrite<F>(self, f: &mut F) -> Wikicode
    where
        F: FnMut(&Node) -> Option<Vec<Node>>,
    {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            match f(&node) {
                Some(replacement) => nodes.extend(replacement),
                None => nodes.push(node.rewrite_children(f)),
            }
        }
        Wikicode { nodes }
    }
}

impl Node {
    /// Child node sequences in document order.
    pub fn children(&self) -> Vec<&Wikicode> {
        match self {
            Node::Template(t) => iter::once(&t.name)
                .chain(t.params.iter().map(|p| &p.value))
                .collect(),
            Node::Tag(t) => t.contents.iter().collect(),
            Node::WikiLink(l) => iter::once(&l.target).chain(l.text.iter()).collect(),
            Node::ExternalLink(l) => l.title.iter().collect(),
            Node::Text(_) | Node::Comment(_) | Node::Style(_) | Node::FootnoteMarker(_) => {
                Vec::new()
            }
        }
    }

    fn rewrite_children<F>(self, f: &mut F) -> Node
    where
        F: FnMut(&Node) -> Option<Vec<Node>>,
    {
        match self {
            Node::Template(t) => {
                let name = t.name.rewrite(f);
                let params = t
                    .params
                    .into_iter()
                    .map(|p| Parameter {
                        name: p.name,
                        value: p.value.rewrite(f),
                        showkey: p.showkey,
                    })
                    .collect();
                Node::Template(Template { name, params })
            }
            Node::Tag(t) => Node::Tag(Tag {
                name: t.name,
                attrs: t.attrs,
                contents: t.contents.map(|c| c.rewrite(f)),
            }),
            Node::WikiLink(l) => {
                let target = l.target.rewrite(f);
                let text = l.text.map(|t| t.rewrite(f));
                Node::WikiLink(WikiLink { target, text })
            }
            Node::ExternalLink(l) => Node::ExternalLink(ExternalLink {
                url: l.url,
                title: l.title.map(|t| t.rewrite(f)),
            }),
            other => other,
        }
    }

    fn write_plain(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) | Node::Template(_) | Node::Style(_) => {}
            Node::Tag(tag) => tag.write_plain(out),
            Node::WikiLink(link) => match &link.text {
                Some(text) => text.write_plain(out),
                None => link.target.write_plain(out),
            },
            Node::ExternalLink(link) => match &link.title {
                Some(title) => title.write_plain(out),
                None => out.push_str(&link.url),
            },
            Node::FootnoteMarker(number) => marker::push_marker(out, *number),
        }
    }
}

impl Template {
    /// Plain-text template name, trimmed.
    pub fn name_text(&self) -> String {
        self.name.strip_code().trim().to_string()
    }

    /// The parameter called `name`; when repeated, the last one wins.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().rev().find(|p| p.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl Tag {
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Value of the attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<String> {
        ATTRIBUTE.captures_iter(&self.attrs).find_map(|caps| {
            if !caps[1].eq_ignore_ascii_case(name) {
                return None;
            }
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
        })
    }

    fn write_plain(&self, out: &mut String) {
        match self.name.as_str() {
            "br" => out.push('\n'),
            "ref" => {}
            _ => {
                if let Some(contents) = &self.contents {
                    contents.write_plain(out);
                }
            }
        }
    }
}

/// What ends the node sequence currently being parsed.
enum Context<'c> {
    Top,
    TemplateField,
    LinkTarget,
    LinkText,
    ExternalTitle,
    Tag(&'c str),
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    /// Offsets where a construct was attempted and turned out to be text.
    failed: HashSet<usize>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_stop(&self, ctx: &Context) -> bool {
        let rest = self.rest();
        match ctx {
            Context::Top => false,
            Context::TemplateField => rest.starts_with('|') || rest.starts_with("}}"),
            Context::LinkTarget => rest.starts_with('|') || rest.starts_with("]]"),
            Context::LinkText => rest.starts_with("]]"),
            Context::ExternalTitle => rest.starts_with(']'),
            Context::Tag(name) => closing_tag_len(rest, name).is_some(),
        }
    }

    /// Parse nodes up to (not including) the terminator of `ctx`.
    ///
    /// Returns `None` if the input ends before the terminator; at the top
    /// level the end of input is the terminator.
    fn parse_until(&mut self, ctx: &Context) -> Option<Wikicode> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        loop {
            if self.at_stop(ctx) {
                break;
            }
            if self.pos >= self.src.len() {
                if matches!(ctx, Context::Top) {
                    break;
                }
                return None;
            }

            if let Some(node) = self.parse_construct() {
                flush_text(&mut text, &mut nodes);
                nodes.push(node);
                continue;
            }

            if let Some((decoded, len)) = decode_entity(self.rest()) {
                text.push_str(&decoded);
                self.pos += len;
                continue;
            }

            if let Some(c) = self.rest().chars().next() {
                text.push(c);
                self.pos += c.len_utf8();
            }
        }

        flush_text(&mut text, &mut nodes);
        Some(Wikicode { nodes })
    }

    /// Try to parse a construct at the current position, restoring the
    /// position if it turns out not to be one.
    ///
    /// A construct's extent depends only on where it starts, so a start that
    /// failed once is not tried again. Without this, runs of unclosed `{{`
    /// or `[[` take exponential time.
    fn parse_construct(&mut self) -> Option<Node> {
        let start = self.pos;
        if self.depth >= MAX_NESTING || self.failed.contains(&start) {
            return None;
        }
        let rest = self.rest();
        if !rest.starts_with(['<', '{', '[', '\'']) {
            return None;
        }

        self.depth += 1;
        let node = if rest.starts_with("<!--") {
            Some(self.parse_comment())
        } else if rest.starts_with("{{") {
            self.parse_template()
        } else if rest.starts_with("[[") {
            self.parse_wikilink()
        } else if rest.starts_with('[') {
            self.parse_external_link()
        } else if rest.starts_with("''") {
            Some(self.parse_style())
        } else if rest.starts_with('<') {
            self.parse_tag()
        } else {
            None
        };
        self.depth -= 1;

        if node.is_none() {
            self.pos = start;
            self.failed.insert(start);
        }
        node
    }

    fn parse_comment(&mut self) -> Node {
        let body = &self.rest()["<!--".len()..];
        match body.find("-->") {
            Some(end) => {
                self.pos += "<!--".len() + end + "-->".len();
                Node::Comment(body[..end].to_string())
            }
            None => {
                // An unclosed comment runs to the end of the page.
                self.pos = self.src.len();
                Node::Comment(body.to_string())
            }
        }
    }

    fn parse_template(&mut self) -> Option<Node> {
        self.pos += 2;
        let name = self.parse_until(&Context::TemplateField)?;

        let mut params = Vec::new();
        let mut positional = 0;
        loop {
            if self.rest().starts_with("}}") {
                self.pos += 2;
                break;
            }
            // At '|'
            self.pos += 1;
            let field = self.parse_until(&Context::TemplateField)?;
            params.push(split_parameter(field, &mut positional));
        }

        Some(Node::Template(Template { name, params }))
    }

    fn parse_wikilink(&mut self) -> Option<Node> {
        self.pos += 2;
        let target = self.parse_until(&Context::LinkTarget)?;
        let text = if self.rest().starts_with('|') {
            self.pos += 1;
            Some(self.parse_until(&Context::LinkText)?)
        } else {
            None
        };
        // At "]]"
        self.pos += 2;
        Some(Node::WikiLink(WikiLink { target, text }))
    }

    fn parse_external_link(&mut self) -> Option<Node> {
        let after = &self.rest()[1..];
        if !URL_SCHEMES.iter().any(|s| after.starts_with(*s)) {
            return None;
        }
        let url_len = after
            .find(|c: char| c.is_whitespace() || c == ']' || c == '<')
            .unwrap_or(after.len());
        let url = after[..url_len].to_string();
        self.pos += 1 + url_len;

        let rest = self.rest();
        if rest.starts_with(']') {
            self.pos += 1;
            return Some(Node::ExternalLink(ExternalLink { url, title: None }));
        }
        if !rest.starts_with(' ') && !rest.starts_with('\t') {
            return None;
        }
        self.pos += 1;
        let title = self.parse_until(&Context::ExternalTitle)?;
        self.pos += 1;
        Some(Node::ExternalLink(ExternalLink { url, title: Some(title) }))
    }

    fn parse_style(&mut self) -> Node {
        let count = self.rest().chars().take_while(|&c| c == '\'').count();
        self.pos += count;
        Node::Style(count)
    }

    fn parse_tag(&mut self) -> Option<Node> {
        let (name, attrs, self_closing, len) = {
            let caps = OPEN_TAG.captures(self.rest())?;
            let name = caps[1].to_ascii_lowercase();
            let self_closing = !caps[3].is_empty() || VOID_TAGS.contains(&name.as_str());
            (name, caps[2].trim().to_string(), self_closing, caps[0].len())
        };
        self.pos += len;

        if self_closing {
            return Some(Node::Tag(Tag { name, attrs, contents: None }));
        }

        let contents = if RAW_TAGS.contains(&name.as_str()) {
            let (end, close_len) = find_closing_tag(self.rest(), &name)?;
            let raw = &self.rest()[..end];
            self.pos += end + close_len;
            let nodes = if raw.is_empty() {
                Vec::new()
            } else {
                vec![Node::Text(raw.to_string())]
            };
            Wikicode { nodes }
        } else {
            let contents = self.parse_until(&Context::Tag(name.as_str()))?;
            self.pos += closing_tag_len(self.rest(), &name)?;
            contents
        };

        Some(Node::Tag(Tag { name, attrs, contents: Some(contents) }))
    }
}

fn flush_text(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

/// Split a template field into a named or positional parameter.
///
/// The name ends at the first `=` in a top-level text node; a field with no
/// such `=` is positional.
fn split_parameter(field: Wikicode, positional: &mut usize) -> Parameter {
    let mut nodes = field.nodes;
    let split = nodes
        .iter()
        .position(|n| matches!(n, Node::Text(t) if t.contains('=')));

    if let Some(i) = split {
        let mut value_nodes = nodes.split_off(i + 1);
        if let Some(Node::Text(text)) = nodes.pop() {
            let (before, after) = text.split_once('=').unwrap_or((text.as_str(), ""));
            if !before.is_empty() {
                nodes.push(Node::Text(before.to_string()));
            }
            if !after.is_empty() {
                value_nodes.insert(0, Node::Text(after.to_string()));
            }
        }
        return Parameter {
            name: Wikicode { nodes }.strip_code().trim().to_string(),
            value: Wikicode { nodes: value_nodes },
            showkey: true,
        };
    }

    *positional += 1;
    Parameter {
        name: positional.to_string(),
        value: Wikicode { nodes },
        showkey: false,
    }
}

/// Length of a closing tag `</name>` at the start of `rest`, if there is one.
fn closing_tag_len(rest: &str, name: &str) -> Option<usize> {
    let after = rest.strip_prefix("</")?;
    let candidate = after.get(..name.len())?;
    if !candidate.eq_ignore_ascii_case(name) {
        return None;
    }
    let tail = &after[name.len()..];
    let trimmed = tail.trim_start();
    if !trimmed.starts_with('>') {
        return None;
    }
    Some(2 + name.len() + (tail.len() - trimmed.len()) + 1)
}

/// Offset and length of the first closing tag `</name>` in `rest`.
fn find_closing_tag(rest: &str, name: &str) -> Option<(usize, usize)> {
    rest.match_indices("</")
        .find_map(|(i, _)| closing_tag_len(&rest[i..], name).map(|len| (i, len)))
}

/// Decode a character reference at the start of `rest`.
fn decode_entity(rest: &str) -> Option<(String, usize)> {
    if !rest.starts_with('&') {
        return None;
    }
    let caps = ENTITY.captures(rest)?;
    let body = &caps[1];

    let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?.to_string()
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)?.to_string()
    } else {
        let s = match body {
            "nbsp" | "thinsp" | "ensp" | "emsp" => " ",
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            "apos" => "'",
            "ndash" => "–",
            "mdash" => "—",
            "hellip" => "…",
            _ => return None,
        };
        s.to_string()
    };

    Some((decoded, caps[0].len()))
}
