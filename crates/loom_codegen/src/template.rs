//! Template Sources & Splicing
//!
//! Pass templates are minijinja templates written in the shader syntax
//! (`{$ … $}` blocks, `{{ … }}` variables, `$$` line statements). The
//! generated fragments and struct declarations reach the template through a
//! single `pass` object:
//!
//! | Directive                           | Result                                      |
//! |-------------------------------------|---------------------------------------------|
//! | `{{ pass.splice("Graph") }}`        | named fragment, verbatim                    |
//! | `{{ pass.build_type("AttributesMesh") }}` | struct declaration against the closed field set |
//! | `pass.active("VaryingsMeshToPS.color")` | whether the field is active             |
//! | `pass.name`                         | pass name                                   |
//!
//! Templates are fetched through a [`TemplateSource`]. Every template read
//! while rendering, includes included, is recorded as a dependency.
//!
//! Include paths are normalized (`.` and `..` collapsed) before they reach
//! the source, so every source sees the same name. A path climbing above
//! the source root is a [`LoomError::MalformedDirective`].

use std::borrow::Cow;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use loom_core::errors::{LoomError, Result};
use minijinja::value::{Object, Value, from_args};
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior, syntax::SyntaxConfig};
use parking_lot::Mutex;
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::active_fields::ActiveFields;

// ─── Sources ─────────────────────────────────────────────────────────────────

/// Supplies raw template text by path.
///
/// `Ok(None)` means the path does not exist; `Err` is reserved for failures
/// reading a template that does.
pub trait TemplateSource: Send + Sync {
    fn load(&self, path: &str) -> io::Result<Option<String>>;
}

/// In-memory templates keyed by path.
#[derive(Debug, Default, Clone)]
pub struct MemoryTemplateSource {
    templates: FxHashMap<String, String>,
}

impl MemoryTemplateSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_template(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(path.into(), text.into());
    }
}

impl TemplateSource for MemoryTemplateSource {
    fn load(&self, path: &str) -> io::Result<Option<String>> {
        Ok(self.templates.get(path).cloned())
    }
}

/// Templates read from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateSource {
    root: PathBuf,
}

impl DirectoryTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirectoryTemplateSource {
    /// Paths are normalized first; a path leaving the root is rejected with
    /// [`io::ErrorKind::InvalidInput`].
    fn load(&self, path: &str) -> io::Result<Option<String>> {
        let relative = normalize_template_path(path)
            .filter(|p| Path::new(p).components().all(|c| matches!(c, Component::Normal(_))))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("template path '{path}' leaves the template root"),
                )
            })?;
        match std::fs::read_to_string(self.root.join(relative)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Default HD pass templates compiled into the binary.
#[derive(RustEmbed)]
#[folder = "templates"]
pub struct BuiltinTemplates;

impl TemplateSource for BuiltinTemplates {
    fn load(&self, path: &str) -> io::Result<Option<String>> {
        let Some(file) = Self::get(path) else {
            return Ok(None);
        };
        match std::str::from_utf8(file.data.as_ref()) {
            Ok(text) => Ok(Some(text.to_string())),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}

// ─── Splice Context ──────────────────────────────────────────────────────────

/// Everything a pass template can reach through `pass`.
#[derive(Debug, Default)]
pub struct SpliceContext {
    pass_name: String,
    fragments: FxHashMap<String, String>,
    structs: FxHashMap<String, String>,
    active: ActiveFields,
}

impl SpliceContext {
    pub fn new(pass_name: impl Into<String>, active: ActiveFields) -> Self {
        Self {
            pass_name: pass_name.into(),
            active,
            ..Self::default()
        }
    }

    pub fn add_fragment(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.fragments.insert(name.into(), text.into());
    }

    /// Registers the prebuilt declaration of struct `name`.
    pub fn add_struct(&mut self, name: impl Into<String>, declaration: String) {
        self.structs.insert(name.into(), declaration);
    }

    #[must_use]
    pub fn fragment(&self, name: &str) -> Option<&str> {
        self.fragments.get(name).map(String::as_str)
    }
}

fn unknown(kind: &str, name: &str) -> Error {
    Error::new(ErrorKind::InvalidOperation, format!("unknown {kind} '{name}'"))
}

impl Object for SpliceContext {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "name" => Some(Value::from(self.pass_name.clone())),
            _ => None,
        }
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &minijinja::State,
        name: &str,
        args: &[Value],
    ) -> std::result::Result<Value, Error> {
        match name {
            "splice" => {
                let (fragment,): (&str,) = from_args(args)?;
                self.fragments
                    .get(fragment)
                    .map(|text| Value::from(text.as_str()))
                    .ok_or_else(|| unknown("fragment", fragment))
            }
            "build_type" => {
                let (struct_name,): (&str,) = from_args(args)?;
                self.structs
                    .get(struct_name)
                    .map(|text| Value::from(text.as_str()))
                    .ok_or_else(|| unknown("struct type", struct_name))
            }
            "active" => {
                let (field,): (&str,) = from_args(args)?;
                Ok(Value::from(self.active.contains(field)))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("method {name} not found"),
            )),
        }
    }
}

#[derive(Serialize)]
struct RenderContext {
    pass: Value,
}

// ─── Splicer ─────────────────────────────────────────────────────────────────

/// Rendered pass template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplicedTemplate {
    pub source: String,
    /// Every template read, in load order.
    pub dependencies: Vec<String>,
}

#[derive(Default)]
struct LoadLog {
    loaded: Vec<String>,
    missing: Vec<String>,
    failed: Option<(String, io::Error)>,
    escaped: Option<String>,
}

/// Renders pass templates from a [`TemplateSource`].
#[derive(Clone)]
pub struct TemplateSplicer {
    source: Arc<dyn TemplateSource>,
}

impl TemplateSplicer {
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self { source }
    }

    /// Renders `template` with `context`.
    ///
    /// A fresh environment is built per call, so no state leaks between
    /// passes and concurrent calls never contend.
    pub fn splice(&self, pass: &str, template: &str, context: SpliceContext) -> Result<SplicedTemplate> {
        if normalize_template_path(template).is_none() {
            return Err(escaped(pass, template));
        }
        let root = match self.source.load(template) {
            Ok(Some(text)) => text,
            Ok(None) => {
                log::error!("Pass '{pass}': template '{template}' not found");
                return Err(LoomError::TemplateNotFound {
                    pass: pass.to_string(),
                    template: template.to_string(),
                });
            }
            Err(source) => {
                return Err(LoomError::TemplateSource {
                    template: template.to_string(),
                    source,
                });
            }
        };

        let loads = Arc::new(Mutex::new(LoadLog {
            loaded: vec![template.to_string()],
            ..LoadLog::default()
        }));
        let mut env = self.environment(Arc::clone(&loads))?;
        env.add_template_owned(template.to_string(), root)
            .map_err(|e| malformed(pass, &e))?;

        let rendered = env
            .get_template(template)
            .and_then(|t| {
                t.render(RenderContext {
                    pass: Value::from_object(context),
                })
            });

        let mut loads = loads.lock();
        match rendered {
            Ok(source) => Ok(SplicedTemplate {
                source,
                dependencies: std::mem::take(&mut loads.loaded),
            }),
            Err(err) => {
                if let Some(path) = loads.escaped.take() {
                    return Err(escaped(pass, &path));
                }
                if let Some((template, source)) = loads.failed.take() {
                    return Err(LoomError::TemplateSource { template, source });
                }
                if err.kind() == ErrorKind::TemplateNotFound {
                    let template = loads.missing.pop().unwrap_or_else(|| template.to_string());
                    log::error!("Pass '{pass}': template '{template}' not found");
                    return Err(LoomError::TemplateNotFound {
                        pass: pass.to_string(),
                        template,
                    });
                }
                Err(malformed(pass, &err))
            }
        }
    }

    fn environment(&self, loads: Arc<Mutex<LoadLog>>) -> Result<Environment<'static>> {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .map_err(|e| LoomError::MalformedDirective {
                pass: String::new(),
                detail: e.to_string(),
            })?;

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_path_join_callback(join_template_path);

        let source = Arc::clone(&self.source);
        env.set_loader(move |name| {
            // Joined names are normalized unless they climbed above the root.
            if normalize_template_path(name).is_none() {
                loads.lock().escaped = Some(name.to_string());
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("include '{name}' leaves the template root"),
                ));
            }
            match source.load(name) {
                Ok(Some(text)) => {
                    loads.lock().loaded.push(name.to_string());
                    Ok(Some(text))
                }
                Ok(None) => {
                    loads.lock().missing.push(name.to_string());
                    Ok(None)
                }
                Err(e) => {
                    let err = Error::new(
                        ErrorKind::InvalidOperation,
                        format!("failed to read template '{name}': {e}"),
                    );
                    loads.lock().failed = Some((name.to_string(), e));
                    Err(err)
                }
            }
        });

        Ok(env)
    }
}

fn malformed(pass: &str, err: &Error) -> LoomError {
    LoomError::MalformedDirective {
        pass: pass.to_string(),
        detail: err.to_string(),
    }
}

fn escaped(pass: &str, path: &str) -> LoomError {
    LoomError::MalformedDirective {
        pass: pass.to_string(),
        detail: format!("template path '{path}' leaves the template root"),
    }
}

/// Collapses empty, `.` and `..` segments of a `/`-separated template path.
/// Returns `None` when `..` climbs above the root.
#[must_use]
pub fn normalize_template_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            _ => segments.push(segment),
        }
    }
    Some(segments.join("/"))
}

/// Includes resolve against the including template's directory; a leading
/// `/` anchors them at the source root. A path climbing above the root is
/// passed through unnormalized and rejected by the loader.
fn join_template_path<'s>(name: &'s str, parent: &'s str) -> Cow<'s, str> {
    let joined = match (name.strip_prefix('/'), parent.rfind('/')) {
        (Some(absolute), _) => Cow::Borrowed(absolute),
        (None, Some(i)) => Cow::Owned(format!("{}/{}", &parent[..i], name)),
        (None, None) => Cow::Borrowed(name),
    };
    match normalize_template_path(&joined) {
        Some(normalized) if normalized == joined => joined,
        Some(normalized) => Cow::Owned(normalized),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splicer(source: MemoryTemplateSource) -> TemplateSplicer {
        TemplateSplicer::new(Arc::new(source))
    }

    fn context() -> SpliceContext {
        let mut active = ActiveFields::new();
        active.insert("VaryingsMeshToPS.color");
        let mut ctx = SpliceContext::new("Forward", active);
        ctx.add_fragment("PassName", "Forward");
        ctx.add_struct("Mesh", "struct Mesh\n{\n};\n".to_string());
        ctx
    }

    #[test]
    fn test_splice_and_build_type() {
        let source = MemoryTemplateSource::new().with_template(
            "passes/A.template",
            "Name \"{{ pass.splice(\"PassName\") }}\"\n{{ pass.build_type(\"Mesh\") }}",
        );
        let out = splicer(source).splice("Forward", "passes/A.template", context()).unwrap();
        assert_eq!(out.source, "Name \"Forward\"\nstruct Mesh\n{\n};\n");
        assert_eq!(out.dependencies, vec!["passes/A.template"]);
    }

    #[test]
    fn test_active_predicate_and_line_statements() {
        let text = "$$ if pass.active(\"VaryingsMeshToPS.color\")\ncolor\n$$ endif\n$$ if pass.active(\"VaryingsMeshToPS.normalWS\")\nnormal\n$$ endif\n";
        let source = MemoryTemplateSource::new().with_template("t", text);
        let out = splicer(source).splice("Forward", "t", context()).unwrap();
        assert_eq!(out.source, "color\n");
    }

    #[test]
    fn test_include_is_relative_and_recorded() {
        let source = MemoryTemplateSource::new()
            .with_template("passes/A.template", "{$ include \"shared.template\" $}|{$ include \"/root.template\" $}")
            .with_template("passes/shared.template", "S")
            .with_template("root.template", "R");
        let out = splicer(source).splice("Forward", "passes/A.template", context()).unwrap();
        assert_eq!(out.source, "S|R");
        assert_eq!(
            out.dependencies,
            vec!["passes/A.template", "passes/shared.template", "root.template"]
        );
    }

    #[test]
    fn test_missing_root_template() {
        let err = splicer(MemoryTemplateSource::new())
            .splice("Forward", "nope.template", context())
            .unwrap_err();
        assert!(matches!(
            err,
            LoomError::TemplateNotFound { ref pass, ref template } if pass == "Forward" && template == "nope.template"
        ));
    }

    #[test]
    fn test_missing_include() {
        let source = MemoryTemplateSource::new().with_template("a", "{$ include \"gone\" $}");
        let err = splicer(source).splice("Forward", "a", context()).unwrap_err();
        assert!(matches!(err, LoomError::TemplateNotFound { ref template, .. } if template == "gone"));
    }

    #[test]
    fn test_unknown_fragment_is_malformed() {
        let source = MemoryTemplateSource::new().with_template("a", "{{ pass.splice(\"Nope\") }}");
        let err = splicer(source).splice("Forward", "a", context()).unwrap_err();
        match err {
            LoomError::MalformedDirective { pass, detail } => {
                assert_eq!(pass, "Forward");
                assert!(detail.contains("Nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_struct_and_syntax_errors_are_malformed() {
        let source = MemoryTemplateSource::new()
            .with_template("a", "{{ pass.build_type(\"Nope\") }}")
            .with_template("b", "{$ if $}");
        let splicer = splicer(source);
        assert!(matches!(
            splicer.splice("P", "a", context()),
            Err(LoomError::MalformedDirective { .. })
        ));
        assert!(matches!(
            splicer.splice("P", "b", context()),
            Err(LoomError::MalformedDirective { .. })
        ));
    }

    #[test]
    fn test_builtin_templates_are_embedded() {
        assert!(BuiltinTemplates.load("passes/Forward.template").unwrap().is_some());
        assert!(BuiltinTemplates.load("passes/Missing.template").unwrap().is_none());
    }

    #[test]
    fn test_join_template_path() {
        assert_eq!(join_template_path("b", "dir/a"), "dir/b");
        assert_eq!(join_template_path("/b", "dir/a"), "b");
        assert_eq!(join_template_path("b", "a"), "b");
        assert_eq!(join_template_path("../shared/S", "passes/A"), "shared/S");
        assert_eq!(join_template_path("./x/../y", "passes/A"), "passes/y");
        assert_eq!(join_template_path("../../up", "passes/A"), "passes/../../up");
    }

    #[test]
    fn test_normalize_template_path() {
        assert_eq!(normalize_template_path("a/./b//c").as_deref(), Some("a/b/c"));
        assert_eq!(normalize_template_path("a/../b").as_deref(), Some("b"));
        assert_eq!(normalize_template_path("/a").as_deref(), Some("a"));
        assert_eq!(normalize_template_path(".."), None);
        assert_eq!(normalize_template_path("a/../../b"), None);
    }

    #[test]
    fn test_parent_include_resolves_in_memory() {
        let source = MemoryTemplateSource::new()
            .with_template("passes/A.template", "{$ include \"../shared/S.template\" $}")
            .with_template("shared/S.template", "S");
        let out = splicer(source).splice("Forward", "passes/A.template", context()).unwrap();
        assert_eq!(out.source, "S");
        assert_eq!(out.dependencies, vec!["passes/A.template", "shared/S.template"]);
    }

    #[test]
    fn test_include_above_root_is_malformed() {
        let source = MemoryTemplateSource::new()
            .with_template("passes/A.template", "{$ include \"../../outside.template\" $}")
            .with_template("outside.template", "X");
        let err = splicer(source)
            .splice("Forward", "passes/A.template", context())
            .unwrap_err();
        assert!(matches!(
            err,
            LoomError::MalformedDirective { ref pass, ref detail } if pass == "Forward" && detail.contains("outside.template")
        ));
    }

    #[test]
    fn test_root_template_above_root_is_malformed() {
        let source = MemoryTemplateSource::new().with_template("../a", "A");
        let err = splicer(source).splice("Forward", "../a", context()).unwrap_err();
        assert!(matches!(err, LoomError::MalformedDirective { .. }));
    }

    #[test]
    fn test_directory_source_stays_under_root() {
        let base = std::env::temp_dir().join(format!("loom-dir-source-{}", std::process::id()));
        let root = base.join("root");
        std::fs::create_dir_all(root.join("passes")).unwrap();
        std::fs::create_dir_all(root.join("shared")).unwrap();
        std::fs::write(root.join("passes/A.template"), "{$ include \"../shared/S.template\" $}").unwrap();
        std::fs::write(root.join("shared/S.template"), "S").unwrap();
        std::fs::write(base.join("secret.template"), "secret").unwrap();

        let source = DirectoryTemplateSource::new(&root);
        let read_outside = source.load("../secret.template");
        let read_absolute = source.load("/passes/A.template");
        let out = TemplateSplicer::new(Arc::new(source.clone()))
            .splice("Forward", "passes/A.template", context());
        std::fs::remove_dir_all(&base).unwrap();

        assert_eq!(read_outside.unwrap_err().kind(), io::ErrorKind::InvalidInput);
        assert!(read_absolute.unwrap().is_some());
        let out = out.unwrap();
        assert_eq!(out.source, "S");
        assert_eq!(out.dependencies, vec!["passes/A.template", "shared/S.template"]);
    }
}
