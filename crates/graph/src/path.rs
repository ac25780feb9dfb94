//! Relative property paths: `this.address.lines()[]`.

use std::fmt;

use pathbind_core::BindingError;

use crate::schema::PropertyKind;

const THIS: &str = "this";

/// One property step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    kind: PropertyKind,
    name: String,
}

impl Step {
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PropertyKind::Field => f.write_str(&self.name),
            PropertyKind::Accessor => write!(f, "{}()", self.name),
        }
    }
}

/// A parsed binding key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphPath {
    steps: Vec<Step>,
    iterate: bool,
}

impl GraphPath {
    /// Parses a dot separated key. `this` may only lead the path; `[]` may
    /// only close it.
    pub fn parse(key: &str) -> Result<Self, BindingError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(BindingError::invalid_key(key, "property path is empty"));
        }

        let segments: Vec<&str> = key.split('.').collect();
        let last = segments.len() - 1;
        let mut steps = Vec::with_capacity(segments.len());
        let mut iterate = false;

        for (position, segment) in segments.into_iter().enumerate() {
            let (segment, iterates) = match segment.strip_suffix("[]") {
                Some(rest) => (rest, true),
                None => (segment, false),
            };
            if iterates && position != last {
                return Err(BindingError::invalid_key(key, "`[]` is only allowed on the last segment"));
            }
            iterate |= iterates;

            if segment == THIS {
                if position != 0 {
                    return Err(BindingError::invalid_key(key, "`this` is only allowed as the first segment"));
                }
                continue;
            }
            steps.push(parse_step(key, segment)?);
        }

        Ok(Self { steps, iterate })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the binding fires once per element of the resolved value.
    pub fn is_iterating(&self) -> bool {
        self.iterate
    }
}

impl fmt::Display for GraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            f.write_str(THIS)?;
        }
        for (position, step) in self.steps.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        if self.iterate {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Parses a parameter key: `this`, `name` or `name()`, with an optional
/// `this.` prefix. `None` stands for the target object itself.
pub fn parse_param(key: &str) -> Result<Option<Step>, BindingError> {
    let trimmed = key.trim();
    let segment = trimmed.strip_prefix("this.").unwrap_or(trimmed);
    if segment == THIS {
        return Ok(None);
    }
    if segment.contains('.') || segment.ends_with("[]") {
        return Err(BindingError::invalid_key(key, "parameter paths are a single property"));
    }
    parse_step(key, segment).map(Some)
}

fn parse_step(key: &str, segment: &str) -> Result<Step, BindingError> {
    let (name, kind) = match segment.strip_suffix("()") {
        Some(name) => (name, PropertyKind::Accessor),
        None => (segment, PropertyKind::Field),
    };
    if name.is_empty() {
        return Err(BindingError::invalid_key(key, "empty path segment"));
    }
    if name.chars().any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']')) {
        return Err(BindingError::invalid_key(key, "malformed path segment"));
    }
    Ok(Step { kind, name: name.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("this", "this", 0, false)]
    #[case("children[]", "children[]", 1, true)]
    #[case("this.children[]", "children[]", 1, true)]
    #[case(" owner.getName() ", "owner.getName()", 2, false)]
    #[case("items()[]", "items()[]", 1, true)]
    #[case("this[]", "this[]", 0, true)]
    fn parses_and_renders(
        #[case] key: &str,
        #[case] canonical: &str,
        #[case] steps: usize,
        #[case] iterate: bool,
    ) {
        let path = GraphPath::parse(key).expect("valid path");
        assert_eq!(path.to_string(), canonical);
        assert_eq!(path.steps().len(), steps);
        assert_eq!(path.is_iterating(), iterate);
    }

    #[rstest]
    #[case("")]
    #[case("a..b")]
    #[case("a[].b")]
    #[case("a.this")]
    #[case("()")]
    #[case("a(b)")]
    fn rejects_malformed_keys(#[case] key: &str) {
        assert!(matches!(GraphPath::parse(key), Err(BindingError::InvalidPathKey { .. })));
    }

    #[rstest]
    #[case("this", None)]
    #[case("this.name", Some("name"))]
    #[case("size()", Some("size()"))]
    fn parameter_keys_are_single_steps(#[case] key: &str, #[case] expected: Option<&str>) {
        let step = parse_param(key).expect("valid parameter");
        assert_eq!(step.map(|step| step.to_string()).as_deref(), expected);
    }

    #[rstest]
    #[case("a.b")]
    #[case("items[]")]
    fn parameter_keys_reject_paths(#[case] key: &str) {
        assert!(parse_param(key).is_err());
    }
}
