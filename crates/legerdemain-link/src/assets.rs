//! Consent page template and static assets.
//!
//! Everything is loaded once, before the listener is bound, and is never
//! mutated afterwards. The embedded copies are used unless an assets
//! directory overrides them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use legerdemain_models::LinkSettings;
use tracing::debug;

use crate::error::LinkError;

const EMBEDDED_INDEX: &str = include_str!("../assets/templates/index.html");
const EMBEDDED_STATIC: &[(&str, &[u8])] = &[
    ("link.js", include_bytes!("../assets/static/link.js")),
    ("style.css", include_bytes!("../assets/static/style.css")),
];

/// Placeholders the consent page must contain.
const REQUIRED_VARS: [Var; 4] = [
    Var::Products,
    Var::Environment,
    Var::PublicKey,
    Var::CallbackPath,
];

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    Products,
    Environment,
    PublicKey,
    CallbackPath,
}

impl Var {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "products" => Some(Self::Products),
            "environment" => Some(Self::Environment),
            "public_key" => Some(Self::PublicKey),
            "callback_path" => Some(Self::CallbackPath),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(Var),
}

/// Consent page template with `{{ name }}` placeholders.
///
/// Parsing checks every placeholder up front, so rendering cannot fail.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    segments: Vec<Segment>,
}

impl PageTemplate {
    /// Parse a template, rejecting unknown, unterminated or missing
    /// placeholders.
    pub fn parse(source: &str) -> Result<Self, LinkError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| LinkError::Template("unterminated placeholder".into()))?;
            let name = after[..end].trim();
            let var = Var::parse(name)
                .ok_or_else(|| LinkError::Template(format!("unknown placeholder \"{name}\"")))?;
            segments.push(Segment::Var(var));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        for var in REQUIRED_VARS {
            if !segments.contains(&Segment::Var(var)) {
                return Err(LinkError::Template(format!(
                    "template lacks the {var:?} placeholder"
                )));
            }
        }

        Ok(Self { segments })
    }

    /// Render the page; every value is HTML-escaped.
    pub fn render(&self, settings: &LinkSettings, callback_path: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(var) => {
                    let value = match var {
                        Var::Products => settings.products.as_str(),
                        Var::Environment => settings.environment.as_str(),
                        Var::PublicKey => settings.public_key.as_str(),
                        Var::CallbackPath => callback_path,
                    };
                    push_escaped(&mut out, value);
                }
            }
        }
        out
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Static assets
// ---------------------------------------------------------------------------

/// A static file ready to be served.
#[derive(Debug, Clone)]
pub struct Asset {
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// File contents.
    pub body: Cow<'static, [u8]>,
}

/// Template plus static files of one link session.
#[derive(Debug, Clone)]
pub struct Assets {
    template: PageTemplate,
    files: HashMap<String, Asset>,
}

impl Assets {
    /// Load the embedded assets, overlaid with `dir` when given.
    ///
    /// With an override directory, `templates/index.html` must exist; files
    /// directly under `static/` replace or extend the embedded ones.
    pub fn load(dir: Option<&Path>) -> Result<Self, LinkError> {
        let mut files: HashMap<String, Asset> = EMBEDDED_STATIC
            .iter()
            .map(|(name, body)| {
                (
                    (*name).to_string(),
                    Asset {
                        content_type: content_type_for(name),
                        body: Cow::Borrowed(*body),
                    },
                )
            })
            .collect();

        let Some(dir) = dir else {
            return Ok(Self {
                template: PageTemplate::parse(EMBEDDED_INDEX)?,
                files,
            });
        };

        let index_path = dir.join("templates").join("index.html");
        let source = fs::read_to_string(&index_path).map_err(|e| {
            LinkError::Template(format!("cannot read {}: {e}", index_path.display()))
        })?;
        let template = PageTemplate::parse(&source)?;

        let static_dir = dir.join("static");
        if static_dir.is_dir() {
            let entries = fs::read_dir(&static_dir).map_err(|e| {
                LinkError::Assets(format!("cannot list {}: {e}", static_dir.display()))
            })?;
            for entry in entries {
                let entry = entry.map_err(|e| LinkError::Assets(e.to_string()))?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let body = fs::read(&path).map_err(|e| {
                    LinkError::Assets(format!("cannot read {}: {e}", path.display()))
                })?;
                debug!(asset = %name, bytes = body.len(), "static asset override loaded");
                files.insert(
                    name.to_string(),
                    Asset {
                        content_type: content_type_for(name),
                        body: Cow::Owned(body),
                    },
                );
            }
        }

        Ok(Self { template, files })
    }

    /// The consent page template.
    pub fn template(&self) -> &PageTemplate {
        &self.template
    }

    /// Look up a static file by its path below `/static/`.
    ///
    /// Only flat names are served; anything with a separator or a parent
    /// reference is refused.
    pub fn get(&self, path: &str) -> Option<&Asset> {
        if path.is_empty() || path.contains(['/', '\\']) || path == ".." {
            return None;
        }
        self.files.get(path)
    }
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LinkSettings {
        LinkSettings::new("transactions", "sandbox", "pk_test")
    }

    #[test]
    fn embedded_template_renders_settings() {
        let assets = Assets::load(None).unwrap();
        let page = assets.template().render(&settings(), "/get_access_token");
        assert!(page.contains(r#"data-products="transactions""#));
        assert!(page.contains(r#"data-environment="sandbox""#));
        assert!(page.contains(r#"data-public-key="pk_test""#));
        assert!(page.contains(r#"data-callback-path="/get_access_token""#));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn values_are_escaped() {
        let template = PageTemplate::parse(
            "{{products}}|{{environment}}|{{ public_key }}|{{callback_path}}",
        )
        .unwrap();
        let page = template.render(
            &LinkSettings::new("<script>", "a\"b", "x'y&z"),
            "/cb",
        );
        assert_eq!(page, "&lt;script&gt;|a&quot;b|x&#39;y&amp;z|/cb");
    }

    #[test]
    fn placeholder_in_value_is_not_expanded() {
        let template = PageTemplate::parse(
            "{{products}} {{environment}} {{public_key}} {{callback_path}}",
        )
        .unwrap();
        let page = template.render(&LinkSettings::new("{{ environment }}", "env", "pk"), "/cb");
        assert_eq!(page, "{{ environment }} env pk /cb");
    }

    #[test]
    fn template_errors() {
        assert!(matches!(
            PageTemplate::parse("{{ products }"),
            Err(LinkError::Template(_))
        ));
        assert!(matches!(
            PageTemplate::parse("{{ nope }}"),
            Err(LinkError::Template(_))
        ));
        // Parses fine but misses required placeholders.
        assert!(matches!(
            PageTemplate::parse("<html>{{ products }}</html>"),
            Err(LinkError::Template(_))
        ));
    }

    #[test]
    fn static_lookup_refuses_nested_paths() {
        let assets = Assets::load(None).unwrap();
        assert_eq!(
            assets.get("link.js").unwrap().content_type,
            "text/javascript; charset=utf-8"
        );
        assert!(assets.get("style.css").is_some());
        assert!(assets.get("../Cargo.toml").is_none());
        assert!(assets.get("..").is_none());
        assert!(assets.get("").is_none());
        assert!(assets.get("favicon.ico").is_none());
    }

    #[test]
    fn override_dir_requires_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = Assets::load(Some(dir.path())).unwrap_err();
        assert!(matches!(err, LinkError::Template(_)));
    }

    #[test]
    fn override_dir_replaces_template_and_extends_static() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::create_dir_all(dir.path().join("static")).unwrap();
        fs::write(
            dir.path().join("templates/index.html"),
            "custom {{products}} {{environment}} {{public_key}} {{callback_path}}",
        )
        .unwrap();
        fs::write(dir.path().join("static/logo.svg"), "<svg/>").unwrap();

        let assets = Assets::load(Some(dir.path())).unwrap();
        let page = assets.template().render(&settings(), "/cb");
        assert_eq!(page, "custom transactions sandbox pk_test /cb");
        assert_eq!(assets.get("logo.svg").unwrap().content_type, "image/svg+xml");
        assert!(assets.get("link.js").is_some());
    }
}
