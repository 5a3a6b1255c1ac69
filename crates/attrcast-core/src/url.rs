use attrcast_model::AttrValue;
use indexmap::IndexMap;
use std::cell::OnceCell;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("empty parameter name in url template `{0}`")]
    EmptyParam(String),
    #[error("url parameter `:{0}` has no value")]
    MissingParam(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Compiled `:name` url template.
///
/// Parameters occupy whole path segments (`/users/:id/books`) and resolve
/// against the record's current attributes on every call, so a template keeps
/// tracking the record after its id changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn compile(template: &str) -> Result<Self, UrlError> {
        let mut segments = Vec::new();
        for piece in template.split('/') {
            if let Some(name) = piece.strip_prefix(':') {
                if name.is_empty() {
                    return Err(UrlError::EmptyParam(template.to_string()));
                }
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Literal(piece.to_string()));
            }
        }
        Ok(UrlTemplate {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Substitute every parameter from `attrs`. A missing attribute or an
    /// explicit null is an error; there is no partial resolution.
    pub fn resolve(&self, attrs: &IndexMap<String, AttrValue>) -> Result<String, UrlError> {
        let mut pieces = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => pieces.push(text.clone()),
                Segment::Param(name) => {
                    let value = attrs
                        .get(name)
                        .filter(|value| !value.is_null())
                        .ok_or_else(|| UrlError::MissingParam(name.clone()))?;
                    pieces.push(value.to_text());
                }
            }
        }
        Ok(pieces.join("/"))
    }
}

/// Template source compiled on first use. Record types keep these so a bad
/// template only surfaces when a url is actually requested, not when the
/// type is declared.
#[derive(Debug)]
pub(crate) struct LazyUrl {
    raw: String,
    compiled: OnceCell<UrlTemplate>,
}

impl LazyUrl {
    pub(crate) fn new(raw: impl Into<String>) -> Self {
        LazyUrl {
            raw: raw.into(),
            compiled: OnceCell::new(),
        }
    }

    pub(crate) fn template(&self) -> Result<&UrlTemplate, UrlError> {
        if let Some(template) = self.compiled.get() {
            return Ok(template);
        }
        let template = UrlTemplate::compile(&self.raw)?;
        Ok(self.compiled.get_or_init(|| template))
    }
}
