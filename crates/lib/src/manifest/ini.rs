//! Minimal INI reader for legacy `manifest.ini` files.
//!
//! Sections keep their file order (application sections are launched in that
//! order); keys are matched case-insensitively. `;` and `#` start a comment
//! line. Values are trimmed; surrounding double quotes are stripped.

use super::ManifestError;

/// One `[section]` with its `key=value` pairs in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
  pub name: String,
  entries: Vec<(String, String)>,
}

impl IniSection {
  /// Value for `key` (case-insensitive). The last occurrence wins.
  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .rev()
      .find(|(k, _)| k.eq_ignore_ascii_case(key))
      .map(|(_, v)| v.as_str())
  }

  /// Non-empty value for `key`.
  pub fn get_non_empty(&self, key: &str) -> Option<&str> {
    self.get(key).filter(|v| !v.is_empty())
  }
}

/// A parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
  sections: Vec<IniSection>,
}

impl IniDocument {
  pub fn parse(content: &str) -> Result<Self, ManifestError> {
    let mut sections: Vec<IniSection> = Vec::new();

    for (index, raw) in content.lines().enumerate() {
      let line = raw.trim().trim_start_matches('\u{feff}');
      if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
        continue;
      }

      if let Some(header) = line.strip_prefix('[') {
        let name = header.strip_suffix(']').ok_or_else(|| ManifestError::Ini {
          line: index + 1,
          message: format!("unterminated section header: {}", line),
        })?;
        sections.push(IniSection {
          name: name.trim().to_string(),
          entries: Vec::new(),
        });
        continue;
      }

      let Some((key, value)) = line.split_once('=') else {
        return Err(ManifestError::Ini {
          line: index + 1,
          message: format!("expected key=value, found: {}", line),
        });
      };

      let section = sections.last_mut().ok_or_else(|| ManifestError::Ini {
        line: index + 1,
        message: "key outside of any section".to_string(),
      })?;

      section.entries.push((key.trim().to_string(), unquote(value.trim()).to_string()));
    }

    Ok(Self { sections })
  }

  /// First section named `name` (case-insensitive).
  pub fn section(&self, name: &str) -> Option<&IniSection> {
    self.sections.iter().find(|s| s.name.eq_ignore_ascii_case(name))
  }

  /// All sections, in file order.
  pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
    self.sections.iter()
  }
}

fn unquote(value: &str) -> &str {
  value
    .strip_prefix('"')
    .and_then(|v| v.strip_suffix('"'))
    .unwrap_or(value)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_sections_in_order() {
    let doc = IniDocument::parse("[B]\nx=1\n[A]\ny=2\n").unwrap();
    let names: Vec<_> = doc.sections().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["B", "A"]);
  }

  #[test]
  fn keys_and_sections_are_case_insensitive() {
    let doc = IniDocument::parse("[Manifest]\nSourceRootPath = /src \n").unwrap();
    let section = doc.section("manifest").unwrap();
    assert_eq!(section.get("sourcerootpath"), Some("/src"));
  }

  #[test]
  fn skips_comments_and_blank_lines() {
    let doc = IniDocument::parse("; comment\n\n# other\n[S]\n; inside\nk=v\n").unwrap();
    assert_eq!(doc.section("S").unwrap().get("k"), Some("v"));
  }

  #[test]
  fn value_may_contain_equals_and_quotes() {
    let doc = IniDocument::parse("[S]\nargs=--mode=fast\npath=\"C:/Program Files\"\n").unwrap();
    let s = doc.section("S").unwrap();
    assert_eq!(s.get("args"), Some("--mode=fast"));
    assert_eq!(s.get("path"), Some("C:/Program Files"));
  }

  #[test]
  fn empty_values_are_filtered_by_get_non_empty() {
    let doc = IniDocument::parse("[S]\nk=\n").unwrap();
    let s = doc.section("S").unwrap();
    assert_eq!(s.get("k"), Some(""));
    assert_eq!(s.get_non_empty("k"), None);
  }

  #[test]
  fn key_outside_section_is_an_error() {
    let err = IniDocument::parse("k=v\n").unwrap_err();
    assert!(matches!(err, ManifestError::Ini { line: 1, .. }));
  }

  #[test]
  fn malformed_line_reports_line_number() {
    let err = IniDocument::parse("[S]\nk=v\nnot a pair\n").unwrap_err();
    assert!(matches!(err, ManifestError::Ini { line: 3, .. }));
  }
}
