/// Template mini-language: parsing into a node tree and rendering.
///
/// Syntax (default delimiters):
/// - `<a|b|c>` → pick one option uniformly at random
/// - `{text}` → keep `text` with probability [`OMIT_INCLUSION_PROBABILITY`]
/// - `[upper]…[/upper]`, `[lower]…[/lower]`, `[sencase]…[/sencase]`,
///   `[startcase]…[/startcase]` → case-transform the rendered inner text
/// - `\` before any structural character → that character, literally
/// - Everything else → literal text, placeholder tokens included

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{Delimiters, TagPair};

/// Chance that an omit group's content is kept.
pub const OMIT_INCLUSION_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed '{delimiter}' opened at byte {position}")]
    Unclosed { delimiter: String, position: usize },
    #[error("empty choice group at byte {position}")]
    EmptyChoice { position: usize },
    #[error("unmatched '{delimiter}' at byte {position}")]
    UnmatchedClose { delimiter: String, position: usize },
}

/// Text-casing applied to a rendered region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseTransform {
    Upper,
    Lower,
    /// Lowercase, then capitalize the first letter of each sentence.
    Sentence,
    /// Capitalize the first letter of each word, leave the rest alone.
    Start,
}

impl CaseTransform {
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Sentence => sentence_case(text),
            Self::Start => start_case(text),
        }
    }
}

fn sentence_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut capitalize = true;
    let mut after_terminator = false;

    for c in text.chars() {
        if capitalize && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.extend(c.to_lowercase());
        }

        if matches!(c, '.' | '!' | '?') {
            after_terminator = true;
        } else if c.is_whitespace() {
            if after_terminator {
                capitalize = true;
            }
        } else {
            after_terminator = false;
        }
    }
    out
}

fn start_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if word_start && !c.is_whitespace() {
            out.extend(c.to_uppercase());
            word_start = false;
        } else {
            out.push(c);
            if c.is_whitespace() {
                word_start = true;
            }
        }
    }
    out
}

/// A node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateNode {
    /// Literal text, emitted as-is.
    Literal(String),
    /// One option is rendered, chosen uniformly. Never empty.
    Choose(Vec<Vec<TemplateNode>>),
    /// Rendered or dropped as a whole.
    Omit(Vec<TemplateNode>),
    /// Body is rendered first, then transformed.
    Case {
        transform: CaseTransform,
        body: Vec<TemplateNode>,
    },
}

/// A parsed template: a sequence of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub nodes: Vec<TemplateNode>,
}

impl Template {
    /// Parse template text into a node tree.
    pub fn parse(input: &str, delimiters: &Delimiters) -> Result<Template, TemplateError> {
        let mut parser = Parser {
            input,
            pos: 0,
            delimiters,
        };
        let (nodes, _) = parser.parse_sequence(Scope::Top)?;
        Ok(Template { nodes })
    }

    /// Render the tree, drawing every random decision from `rng`.
    pub fn render<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, rng, &mut out);
        out
    }
}

/// Parse and render in one step. Nothing is produced unless the whole
/// template parses.
pub fn render<R: Rng + ?Sized>(
    input: &str,
    delimiters: &Delimiters,
    rng: &mut R,
) -> Result<String, TemplateError> {
    Ok(Template::parse(input, delimiters)?.render(rng))
}

fn render_nodes<R: Rng + ?Sized>(nodes: &[TemplateNode], rng: &mut R, out: &mut String) {
    for node in nodes {
        match node {
            TemplateNode::Literal(text) => out.push_str(text),
            TemplateNode::Choose(options) => {
                if let Some(option) = options.choose(rng) {
                    render_nodes(option, rng, out);
                }
            }
            TemplateNode::Omit(body) => {
                if rng.gen_bool(OMIT_INCLUSION_PROBABILITY) {
                    render_nodes(body, rng, out);
                }
            }
            TemplateNode::Case { transform, body } => {
                let mut inner = String::new();
                render_nodes(body, rng, &mut inner);
                out.push_str(&transform.apply(&inner));
            }
        }
    }
}

/// What the sequence currently being parsed is nested in.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Top,
    ChooseOption { open_at: usize },
    Omit { open_at: usize },
    Case {
        transform: CaseTransform,
        open_at: usize,
    },
}

/// Why a sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    End,
    Split,
    ChooseClose,
    OmitClose,
    CaseClose,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    delimiters: &'a Delimiters,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn case_tags(&self) -> [(CaseTransform, &'a TagPair); 4] {
        let d = self.delimiters;
        [
            (CaseTransform::Upper, &d.upper),
            (CaseTransform::Lower, &d.lower),
            (CaseTransform::Sentence, &d.sentence),
            (CaseTransform::Start, &d.start),
        ]
    }

    fn open_tag_here(&self) -> Option<(CaseTransform, &'a str)> {
        let rest = self.rest();
        self.case_tags()
            .into_iter()
            .find(|(_, pair)| rest.starts_with(pair.open.as_str()))
            .map(|(transform, pair)| (transform, pair.open.as_str()))
    }

    fn close_tag_here(&self) -> Option<(CaseTransform, &'a str)> {
        let rest = self.rest();
        self.case_tags()
            .into_iter()
            .find(|(_, pair)| rest.starts_with(pair.close.as_str()))
            .map(|(transform, pair)| (transform, pair.close.as_str()))
    }

    fn is_structural_here(&self, c: char) -> bool {
        let d = self.delimiters;
        [
            d.escape,
            d.choose_open,
            d.choose_close,
            d.choose_split,
            d.omit_open,
            d.omit_close,
        ]
        .contains(&c)
            || self.open_tag_here().is_some()
            || self.close_tag_here().is_some()
    }

    fn tag_for(&self, transform: CaseTransform) -> &'a TagPair {
        let d = self.delimiters;
        match transform {
            CaseTransform::Upper => &d.upper,
            CaseTransform::Lower => &d.lower,
            CaseTransform::Sentence => &d.sentence,
            CaseTransform::Start => &d.start,
        }
    }

    fn parse_sequence(&mut self, scope: Scope) -> Result<(Vec<TemplateNode>, Stop), TemplateError> {
        let d = self.delimiters;
        let mut nodes = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.peek() {
            let here = self.pos;

            if c == d.escape {
                self.pos += c.len_utf8();
                match self.peek() {
                    Some(next) if self.is_structural_here(next) => {
                        literal.push(next);
                        self.pos += next.len_utf8();
                    }
                    // Not escaping anything: keep the escape character.
                    _ => literal.push(c),
                }
                continue;
            }

            if c == d.choose_open {
                flush(&mut literal, &mut nodes);
                self.pos += c.len_utf8();
                nodes.push(self.parse_choose(here)?);
                continue;
            }

            if c == d.omit_open {
                flush(&mut literal, &mut nodes);
                self.pos += c.len_utf8();
                let (body, _) = self.parse_sequence(Scope::Omit { open_at: here })?;
                nodes.push(TemplateNode::Omit(body));
                continue;
            }

            let stop = match scope {
                Scope::ChooseOption { .. } if c == d.choose_split => Some(Stop::Split),
                Scope::ChooseOption { .. } if c == d.choose_close => Some(Stop::ChooseClose),
                Scope::Omit { .. } if c == d.omit_close => Some(Stop::OmitClose),
                _ => None,
            };
            if let Some(stop) = stop {
                self.pos += c.len_utf8();
                flush(&mut literal, &mut nodes);
                return Ok((nodes, stop));
            }

            // A closer or split that does not belong to the innermost group.
            if c == d.choose_close || c == d.choose_split || c == d.omit_close {
                return Err(TemplateError::UnmatchedClose {
                    delimiter: c.to_string(),
                    position: here,
                });
            }

            if let Some((transform, tag)) = self.close_tag_here() {
                return match scope {
                    Scope::Case { transform: open, .. } if open == transform => {
                        self.pos += tag.len();
                        flush(&mut literal, &mut nodes);
                        Ok((nodes, Stop::CaseClose))
                    }
                    _ => Err(TemplateError::UnmatchedClose {
                        delimiter: tag.to_string(),
                        position: here,
                    }),
                };
            }

            if let Some((transform, tag)) = self.open_tag_here() {
                flush(&mut literal, &mut nodes);
                self.pos += tag.len();
                let (body, _) = self.parse_sequence(Scope::Case {
                    transform,
                    open_at: here,
                })?;
                nodes.push(TemplateNode::Case { transform, body });
                continue;
            }

            literal.push(c);
            self.pos += c.len_utf8();
        }

        match scope {
            Scope::Top => {
                flush(&mut literal, &mut nodes);
                Ok((nodes, Stop::End))
            }
            Scope::ChooseOption { open_at } => Err(TemplateError::Unclosed {
                delimiter: d.choose_open.to_string(),
                position: open_at,
            }),
            Scope::Omit { open_at } => Err(TemplateError::Unclosed {
                delimiter: d.omit_open.to_string(),
                position: open_at,
            }),
            Scope::Case { transform, open_at } => Err(TemplateError::Unclosed {
                delimiter: self.tag_for(transform).open.clone(),
                position: open_at,
            }),
        }
    }

    /// Called just past the opening delimiter.
    fn parse_choose(&mut self, open_at: usize) -> Result<TemplateNode, TemplateError> {
        let mut options = Vec::new();
        loop {
            let (option, stop) = self.parse_sequence(Scope::ChooseOption { open_at })?;
            options.push(option);
            if stop == Stop::ChooseClose {
                break;
            }
        }

        if options.len() == 1 && options[0].is_empty() {
            return Err(TemplateError::EmptyChoice { position: open_at });
        }
        Ok(TemplateNode::Choose(options))
    }
}

fn flush(literal: &mut String, nodes: &mut Vec<TemplateNode>) {
    if !literal.is_empty() {
        nodes.push(TemplateNode::Literal(std::mem::take(literal)));
    }
}
