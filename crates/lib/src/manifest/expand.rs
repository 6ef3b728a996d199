//! Environment variable expansion for manifest root paths.
//!
//! # Formats
//!
//! - `%NAME%` - Windows style, as written in most existing manifests
//! - `${NAME}` - shell style
//!
//! Unknown variables are left verbatim so the resulting path still shows
//! which variable was missing. A lone `%` or an unclosed `${` passes through.

/// A parsed piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
  Literal(&'a str),
  /// Variable reference; `raw` is the original text including delimiters.
  Var { name: &'a str, raw: &'a str },
}

fn parse(input: &str) -> Vec<Segment<'_>> {
  let mut segments = Vec::new();
  let mut rest = input;

  while !rest.is_empty() {
    let next = rest.find(['%', '$']);
    let Some(start) = next else {
      segments.push(Segment::Literal(rest));
      break;
    };

    if start > 0 {
      segments.push(Segment::Literal(&rest[..start]));
      rest = &rest[start..];
    }

    let (open, close) = if rest.starts_with("${") { ("${", '}') } else { ("%", '%') };

    if !rest.starts_with(open) {
      // A `$` that does not open `${`.
      segments.push(Segment::Literal(&rest[..1]));
      rest = &rest[1..];
      continue;
    }

    let body = &rest[open.len()..];
    match body.find(close) {
      Some(end) if end > 0 && is_var_name(&body[..end]) => {
        let raw_len = open.len() + end + 1;
        segments.push(Segment::Var {
          name: &body[..end],
          raw: &rest[..raw_len],
        });
        rest = &rest[raw_len..];
      }
      _ => {
        segments.push(Segment::Literal(&rest[..1]));
        rest = &rest[1..];
      }
    }
  }

  segments
}

fn is_var_name(name: &str) -> bool {
  name
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')' | '.' | '-'))
}

/// Expands `%NAME%` and `${NAME}` references using `lookup`.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
  F: Fn(&str) -> Option<String>,
{
  parse(input)
    .into_iter()
    .map(|segment| match segment {
      Segment::Literal(text) => text.to_string(),
      Segment::Var { name, raw } => lookup(name).unwrap_or_else(|| raw.to_string()),
    })
    .collect()
}

/// Expands references against the process environment.
pub fn expand_env_vars(input: &str) -> String {
  expand_with(input, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  fn lookup(name: &str) -> Option<String> {
    match name {
      "LOCALAPPDATA" => Some("C:/Users/me/AppData/Local".to_string()),
      "HOME" => Some("/home/me".to_string()),
      "ProgramFiles(x86)" => Some("C:/PF86".to_string()),
      _ => None,
    }
  }

  #[test]
  fn expands_percent_style() {
    assert_eq!(
      expand_with("%LOCALAPPDATA%/Company/Apps", lookup),
      "C:/Users/me/AppData/Local/Company/Apps"
    );
  }

  #[test]
  fn expands_brace_style() {
    assert_eq!(expand_with("${HOME}/apps", lookup), "/home/me/apps");
  }

  #[test]
  fn expands_names_with_parentheses() {
    assert_eq!(expand_with("%ProgramFiles(x86)%/x", lookup), "C:/PF86/x");
  }

  #[test]
  fn unknown_variables_stay_verbatim() {
    assert_eq!(expand_with("%NOPE%/a/${ALSO_NOPE}", lookup), "%NOPE%/a/${ALSO_NOPE}");
  }

  #[test]
  fn stray_delimiters_pass_through() {
    assert_eq!(expand_with("100% $HOME ${unclosed", lookup), "100% $HOME ${unclosed");
    assert_eq!(expand_with("a%%b", lookup), "a%%b");
  }

  #[test]
  fn plain_paths_are_unchanged() {
    assert_eq!(expand_with("//server/share/apps", lookup), "//server/share/apps");
    assert_eq!(expand_with("", lookup), "");
  }

  #[test]
  #[serial]
  fn expands_from_process_environment() {
    temp_env::with_var("SYNCBRIDGE_TEST_ROOT", Some("/mnt/source"), || {
      assert_eq!(expand_env_vars("%SYNCBRIDGE_TEST_ROOT%/apps"), "/mnt/source/apps");
      assert_eq!(expand_env_vars("${SYNCBRIDGE_TEST_ROOT}/apps"), "/mnt/source/apps");
    });
  }
}
