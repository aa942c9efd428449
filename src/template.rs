//! Message templates with `{N.key}`, `{N.value}` and `{N.tag}` capture references

use crate::capture::{CaptureField, Captures};
use crate::error::CompileError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Capture { slot: usize, field: CaptureField },
}

/// A parsed text template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl MessageTemplate {
    /// Parse a template. `{{` and `}}` produce literal braces.
    pub fn parse(source: &str) -> Result<Self, CompileError> {
        let error = |message: String| CompileError::Template {
            template: source.to_string(),
            message,
        };

        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|(_, c)| *c) == Some('{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().map(|(_, c)| *c) == Some('}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let rest = &source[pos + 1..];
                    let end = rest
                        .find('}')
                        .ok_or_else(|| error(format!("unclosed '{{' at offset {}", pos)))?;
                    let reference = &rest[..end];
                    let (slot, field) = parse_reference(reference)
                        .ok_or_else(|| error(format!("bad capture reference '{{{}}}'", reference)))?;

                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Capture { slot, field });

                    // skip the reference and the closing brace
                    for _ in 0..=reference.chars().count() {
                        chars.next();
                    }
                }
                '}' => return Err(error(format!("unmatched '}}' at offset {}", pos))),
                c => text.push(c),
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Template text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the template has no capture references
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Text(_)))
    }

    /// Slots referenced by the template, in order of appearance
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture { slot, .. } => Some(*slot),
            Segment::Text(_) => None,
        })
    }

    /// Render against a capture registry.
    ///
    /// Referenced slots are checked at rule compile time; an unset slot renders empty.
    pub fn render(&self, captures: &Captures<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Capture { slot, field } => {
                    if let Some(value) = captures.field(*slot, *field) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_reference(reference: &str) -> Option<(usize, CaptureField)> {
    let (slot, field) = reference.trim().split_once('.')?;
    Some((slot.parse().ok()?, field.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captures() -> Captures<'static> {
        let mut captures = Captures::with_slots(3);
        captures.set(0, "building", "roof");
        captures.set(1, "amenity", "fuel");
        captures
    }

    #[test]
    fn test_static_template() {
        let t = MessageTemplate::parse("Missing relation type").unwrap();
        assert!(t.is_static());
        assert_eq!(t.render(&Captures::with_slots(0)), "Missing relation type");
    }

    #[test]
    fn test_render_fields() {
        let t = MessageTemplate::parse(
            "{0.tag} together with {1.tag}, usually {1.tag} is located underneath the {0.value}. Tag the {1.key} as a separate object.",
        )
        .unwrap();

        assert_eq!(
            t.render(&captures()),
            "building=roof together with amenity=fuel, usually amenity=fuel is located underneath the roof. Tag the amenity as a separate object."
        );
        assert_eq!(t.slots().collect::<Vec<_>>(), vec![0, 1, 1, 0, 1]);
    }

    #[test]
    fn test_escaped_braces() {
        let t = MessageTemplate::parse("{{literal}} {0.key}").unwrap();
        assert_eq!(t.render(&captures()), "{literal} building");
    }

    #[test]
    fn test_reference_at_end_and_start() {
        let t = MessageTemplate::parse("{1.value}").unwrap();
        assert_eq!(t.render(&captures()), "fuel");
    }

    #[test]
    fn test_multibyte_text_around_reference() {
        let t = MessageTemplate::parse("é {0.value} ü").unwrap();
        assert_eq!(t.render(&captures()), "é roof ü");
    }

    #[test]
    fn test_parse_errors() {
        assert!(MessageTemplate::parse("{0.value").is_err());
        assert!(MessageTemplate::parse("{0.name}").is_err());
        assert!(MessageTemplate::parse("{x.key}").is_err());
        assert!(MessageTemplate::parse("oops }").is_err());
    }

    #[test]
    fn test_unset_slot_renders_empty() {
        let t = MessageTemplate::parse("[{2.value}]").unwrap();
        assert_eq!(t.render(&captures()), "[]");
    }
}
