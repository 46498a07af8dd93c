//! Path selectors over documents.
//!
//! Supported syntax is a small JSONPath subset:
//!
//! - `$` - the whole document
//! - `$.field` - a map field (letters, digits, `_` and `-`)
//! - `$['any key']` - a map field with arbitrary characters; `\'` and `\\`
//!   escape a quote or backslash inside the key
//! - `$[0]` - a list element
//!
//! Segments chain, e.g. `$.map.items[2]['display name']`.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::document::Document;

/// Errors from parsing or applying a [`DocumentPath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
  /// The path text could not be parsed.
  #[error("invalid path '{path}': {message}")]
  Syntax { path: String, message: String },

  /// The path does not resolve to a value.
  #[error("path '{path}' not found")]
  NotFound { path: String },

  /// A segment tried to descend into a value that is not a map or list.
  #[error("path '{path}' descends into a {found}")]
  NotAContainer { path: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Field(String),
  Index(usize),
}

/// A parsed path such as `$.items[0].name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentPath {
  segments: Vec<Segment>,
}

impl DocumentPath {
  /// The `$` path.
  pub fn root() -> Self {
    Self::default()
  }

  pub fn is_root(&self) -> bool {
    self.segments.is_empty()
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Append a field segment.
  pub fn field(mut self, name: impl Into<String>) -> Self {
    self.segments.push(Segment::Field(name.into()));
    self
  }

  /// Append an index segment.
  pub fn index(mut self, index: usize) -> Self {
    self.segments.push(Segment::Index(index));
    self
  }

  /// Borrow the sub-document this path points at.
  pub fn select<'a>(&self, doc: &'a Document) -> Result<&'a Document, PathError> {
    let mut current = doc;
    for segment in &self.segments {
      current = match (segment, current) {
        (Segment::Field(name), Document::Map(map)) => map.get(name),
        (Segment::Index(idx), Document::List(items)) => items.get(*idx),
        _ => None,
      }
      .ok_or_else(|| PathError::NotFound {
        path: self.to_string(),
      })?;
    }
    Ok(current)
  }

  /// Write `value` at this path.
  ///
  /// The root path replaces the whole document. Missing intermediate map
  /// fields are created; list indices must already exist.
  pub fn set(&self, doc: &mut Document, value: Document) -> Result<(), PathError> {
    let Some((last, parents)) = self.segments.split_last() else {
      *doc = value;
      return Ok(());
    };

    let mut current = doc;
    for segment in parents {
      current = match segment {
        Segment::Field(name) => {
          let map = self.as_map_mut(current)?;
          map.entry(name.clone()).or_insert_with(Document::map)
        }
        Segment::Index(idx) => self.element_mut(current, *idx)?,
      };
    }

    match last {
      Segment::Field(name) => {
        self.as_map_mut(current)?.insert(name.clone(), value);
      }
      Segment::Index(idx) => {
        *self.element_mut(current, *idx)? = value;
      }
    }
    Ok(())
  }

  fn as_map_mut<'a>(
    &self,
    doc: &'a mut Document,
  ) -> Result<&'a mut IndexMap<String, Document>, PathError> {
    match doc {
      Document::Map(map) => Ok(map),
      other => Err(PathError::NotAContainer {
        path: self.to_string(),
        found: other.type_name().to_string(),
      }),
    }
  }

  fn element_mut<'a>(&self, doc: &'a mut Document, idx: usize) -> Result<&'a mut Document, PathError> {
    match doc {
      Document::List(items) => items.get_mut(idx).ok_or_else(|| PathError::NotFound {
        path: self.to_string(),
      }),
      other => Err(PathError::NotAContainer {
        path: self.to_string(),
        found: other.type_name().to_string(),
      }),
    }
  }
}

fn is_ident_char(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Read a key up to the closing `quote`. A backslash takes the next
/// character literally.
fn read_quoted(text: &str, quote: char) -> Option<(String, &str)> {
  let mut key = String::new();
  let mut chars = text.char_indices();
  while let Some((i, ch)) = chars.next() {
    match ch {
      '\\' => key.push(chars.next()?.1),
      c if c == quote => return Some((key, &text[i + c.len_utf8()..])),
      c => key.push(c),
    }
  }
  None
}

impl FromStr for DocumentPath {
  type Err = PathError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let syntax = |message: &str| PathError::Syntax {
      path: s.to_string(),
      message: message.to_string(),
    };

    let mut rest = s.strip_prefix('$').ok_or_else(|| syntax("must start with '$'"))?;
    let mut segments = Vec::new();

    while !rest.is_empty() {
      if let Some(after_dot) = rest.strip_prefix('.') {
        let end = after_dot
          .find(|c: char| !is_ident_char(c))
          .unwrap_or(after_dot.len());
        if end == 0 {
          return Err(syntax("expected field name after '.'"));
        }
        segments.push(Segment::Field(after_dot[..end].to_string()));
        rest = &after_dot[end..];
      } else if let Some(after_bracket) = rest.strip_prefix('[') {
        match after_bracket.chars().next() {
          Some(quote @ ('\'' | '"')) => {
            let (key, after_key) = read_quoted(&after_bracket[1..], quote)
              .ok_or_else(|| syntax("unterminated quoted key"))?;
            segments.push(Segment::Field(key));
            rest = after_key
              .strip_prefix(']')
              .ok_or_else(|| syntax("expected ']' after quoted key"))?;
          }
          _ => {
            let close = after_bracket
              .find(']')
              .ok_or_else(|| syntax("unclosed '['"))?;
            let idx = after_bracket[..close]
              .parse::<usize>()
              .map_err(|_| syntax("expected index or quoted key inside '[]'"))?;
            segments.push(Segment::Index(idx));
            rest = &after_bracket[close + 1..];
          }
        }
      } else {
        return Err(syntax("expected '.' or '['"));
      }
    }

    Ok(DocumentPath { segments })
  }
}

impl fmt::Display for DocumentPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("$")?;
    for segment in &self.segments {
      match segment {
        Segment::Field(name) if !name.is_empty() && name.chars().all(is_ident_char) => {
          write!(f, ".{}", name)?
        }
        Segment::Field(name) => {
          f.write_str("['")?;
          for ch in name.chars() {
            if ch == '\'' || ch == '\\' {
              f.write_char('\\')?;
            }
            f.write_char(ch)?;
          }
          f.write_str("']")?
        }
        Segment::Index(idx) => write!(f, "[{}]", idx)?,
      }
    }
    Ok(())
  }
}

impl Serialize for DocumentPath {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for DocumentPath {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn path(s: &str) -> DocumentPath {
    s.parse().unwrap()
  }

  fn doc(value: serde_json::Value) -> Document {
    Document::from(value)
  }

  #[test]
  fn test_parse_segments() {
    let p = path("$.map.items[2]['display name']");
    assert_eq!(
      p.segments(),
      &[
        Segment::Field("map".into()),
        Segment::Field("items".into()),
        Segment::Index(2),
        Segment::Field("display name".into()),
      ]
    );
    assert_eq!(p.to_string(), "$.map.items[2]['display name']");
  }

  #[test]
  fn test_quoted_keys_with_quotes_round_trip() {
    for key in ["it's", "a]b", "back\\slash", "say \"hi\"", ""] {
      let p = DocumentPath::root().field(key).index(0);
      let text = p.to_string();
      assert_eq!(text.parse::<DocumentPath>().unwrap(), p, "{}", text);
    }
    assert_eq!(DocumentPath::root().field("it's").to_string(), "$['it\\'s']");
    assert_eq!(path(r#"$["it's"]"#), DocumentPath::root().field("it's"));
  }

  #[test]
  fn test_parse_errors() {
    for bad in ["", "map", "$.", "$[", "$[x]", "$..a", "$a", "$['open", "$['a'x]"] {
      assert!(
        matches!(bad.parse::<DocumentPath>(), Err(PathError::Syntax { .. })),
        "{}",
        bad
      );
    }
  }

  #[test]
  fn test_select() {
    let d = doc(json!({"pk": "A1", "mapLst": [{"num": 1}, {"num": 2}]}));
    assert_eq!(path("$").select(&d).unwrap(), &d);
    assert_eq!(path("$.pk").select(&d).unwrap(), &Document::from("A1"));
    assert_eq!(path("$.mapLst[1].num").select(&d).unwrap(), &Document::from(2i64));
  }

  #[test]
  fn test_select_missing() {
    let d = doc(json!({"list": [1]}));
    assert!(matches!(path("$.nope").select(&d), Err(PathError::NotFound { .. })));
    assert!(matches!(path("$.list[4]").select(&d), Err(PathError::NotFound { .. })));
    assert!(matches!(path("$.list.x").select(&d), Err(PathError::NotFound { .. })));
  }

  #[test]
  fn test_set_root_replaces() {
    let mut d = doc(json!({"a": 1}));
    DocumentPath::root().set(&mut d, Document::from("x")).unwrap();
    assert_eq!(d, Document::from("x"));
  }

  #[test]
  fn test_set_creates_intermediate_maps() {
    let mut d = doc(json!({"a": 1}));
    path("$.result.inner").set(&mut d, Document::from(true)).unwrap();
    assert_eq!(d, doc(json!({"a": 1, "result": {"inner": true}})));
  }

  #[test]
  fn test_set_into_scalar_fails() {
    let mut d = doc(json!({"a": 1}));
    let err = path("$.a.b").set(&mut d, Document::Null).unwrap_err();
    assert!(matches!(err, PathError::NotAContainer { .. }));
  }

  #[test]
  fn test_set_list_element() {
    let mut d = doc(json!({"l": [1, 2]}));
    path("$.l[1]").set(&mut d, Document::from(9i64)).unwrap();
    assert_eq!(d, doc(json!({"l": [1, 9]})));
    assert!(path("$.l[5]").set(&mut d, Document::Null).is_err());
  }

  #[test]
  fn test_serde_as_string() {
    let p: DocumentPath = serde_json::from_value(json!("$.numLst")).unwrap();
    assert_eq!(p, DocumentPath::root().field("numLst"));
    assert_eq!(serde_json::to_value(&p).unwrap(), json!("$.numLst"));
  }
}
