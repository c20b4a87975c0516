//! Composable document assembly.
//!
//! A composable directory carries an `_order.yaml` naming the section files
//! that make up one output document, plus per-variant overrides, inserts,
//! and variable files. `_order.yaml` is a constrained shape, so it is read
//! with a line-oriented parser rather than a full YAML document model.

use crate::error::Result;
use crate::paths::ORDER_FILE;
use crate::source::TemplateSource;
use std::collections::BTreeMap;

/// Sentinel section name marking where variant-specific inserts go.
pub const VARIANT_INSERT: &str = "VARIANT_INSERT";

const INSERTS_KEY: &str = "inserts_at_VARIANT_INSERT";

// ---------------------------------------------------------------------------
// OrderSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct OrderSpec {
    pub name: String,
    pub sections: Vec<String>,
    pub variants: BTreeMap<String, VariantSpec>,
}

#[derive(Debug, Clone, Default)]
pub struct VariantSpec {
    pub frontmatter: Option<String>,
    pub variables: Option<String>,
    pub overrides: BTreeMap<String, String>,
    pub inserts: Vec<String>,
}

impl OrderSpec {
    pub fn variant(&self, name: &str) -> VariantSpec {
        self.variants.get(name).cloned().unwrap_or_default()
    }
}

/// Read and parse `<rel_dir>/_order.yaml`.
pub fn load_order(src: &TemplateSource, rel_dir: &str) -> Result<OrderSpec> {
    let raw = src.read_file(&format!("{rel_dir}/{ORDER_FILE}"))?;
    Ok(parse_order_yaml(&raw))
}

// ---------------------------------------------------------------------------
// _order.yaml parser
// ---------------------------------------------------------------------------

/// Parse the `_order.yaml` shape. Unknown keys are ignored; the parser
/// never fails on malformed lines, it just skips them.
pub fn parse_order_yaml(raw: &str) -> OrderSpec {
    #[derive(PartialEq)]
    enum Mode {
        Top,
        Sections,
        Variants,
    }
    #[derive(PartialEq)]
    enum Sub {
        Overrides,
        Inserts,
    }

    let mut spec = OrderSpec::default();
    let mut mode = Mode::Top;
    let mut variant_indent: Option<usize> = None;
    let mut field_indent: Option<usize> = None;
    let mut current_variant: Option<String> = None;
    let mut current_sub: Option<Sub> = None;

    for line in raw.lines() {
        let trimmed_end = line.trim_end();
        let content = trimmed_end.trim_start();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let indent = trimmed_end.len() - content.len();

        if let Some(item) = content.strip_prefix("- ").or(content.strip_prefix('-')) {
            let item = unquote(strip_comment(item.trim()));
            if item.is_empty() {
                continue;
            }
            match mode {
                Mode::Sections => spec.sections.push(item),
                Mode::Variants => {
                    if current_sub == Some(Sub::Inserts) {
                        if let Some(variant) = variant_mut(&mut spec, &current_variant) {
                            variant.inserts.push(item);
                        }
                    }
                }
                Mode::Top => {}
            }
            continue;
        }

        let Some((key, value)) = content.split_once(':') else {
            continue;
        };
        let key = unquote(key.trim());
        let value = unquote(strip_comment(value.trim()));

        if indent == 0 {
            variant_indent = None;
            field_indent = None;
            current_variant = None;
            current_sub = None;
            match key.as_str() {
                "name" => {
                    spec.name = value;
                    mode = Mode::Top;
                }
                "sections" => mode = Mode::Sections,
                "variants" => mode = Mode::Variants,
                _ => mode = Mode::Top,
            }
            continue;
        }

        if mode != Mode::Variants {
            continue;
        }

        // First nested level names a variant; deeper levels are its fields
        // and, below those, override map entries.
        let v_indent = *variant_indent.get_or_insert(indent);
        if indent == v_indent {
            spec.variants.entry(key.clone()).or_default();
            current_variant = Some(key);
            current_sub = None;
            field_indent = None;
            continue;
        }

        let f_indent = *field_indent.get_or_insert(indent);
        if indent == f_indent {
            current_sub = None;
            let Some(variant) = variant_mut(&mut spec, &current_variant) else {
                continue;
            };
            match key.as_str() {
                "frontmatter" => variant.frontmatter = Some(value),
                "variables" => variant.variables = Some(value),
                "overrides" => current_sub = Some(Sub::Overrides),
                INSERTS_KEY => current_sub = Some(Sub::Inserts),
                _ => {}
            }
        } else if indent > f_indent && current_sub == Some(Sub::Overrides) {
            if let Some(variant) = variant_mut(&mut spec, &current_variant) {
                variant.overrides.insert(key, value);
            }
        }
    }

    spec
}

fn variant_mut<'a>(
    spec: &'a mut OrderSpec,
    current: &Option<String>,
) -> Option<&'a mut VariantSpec> {
    current.as_ref().and_then(|name| spec.variants.get_mut(name))
}

fn strip_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    for quote in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(quote) && v.ends_with(quote) {
            return v[1..v.len() - 1].to_string();
        }
    }
    v.to_string()
}

// ---------------------------------------------------------------------------
// Variable expansion
// ---------------------------------------------------------------------------

/// Substitute `{key}` occurrences with `vars[key]`. No escaping; unknown
/// keys are left in place.
pub fn expand_vars(content: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = content.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Assemble one document from a composable directory.
///
/// Section resolution order: variant override file, then
/// `<rel_dir>/<variant>/<name>.md`, then `<rel_dir>/sections/<name>.md`.
/// Missing sections are silently skipped. Bodies are joined by a blank
/// line, trailing whitespace trimmed, final newline appended.
pub fn compose(
    src: &TemplateSource,
    rel_dir: &str,
    variant: &str,
    extra_vars: &BTreeMap<String, String>,
) -> Result<String> {
    let order = load_order(src, rel_dir)?;
    let vspec = order.variant(variant);

    let mut vars = load_variables(src, rel_dir, &vspec)?;
    for (key, value) in extra_vars {
        vars.insert(key.clone(), value.clone());
    }

    let mut parts: Vec<String> = Vec::new();
    let mut push_section = |name: &str, parts: &mut Vec<String>| -> Result<()> {
        if let Some(body) = read_section(src, rel_dir, variant, &vspec, name)? {
            parts.push(expand_vars(body.trim(), &vars));
        }
        Ok(())
    };

    for section in &order.sections {
        if section == VARIANT_INSERT {
            for insert in &vspec.inserts {
                push_section(insert, &mut parts)?;
            }
        } else {
            push_section(section, &mut parts)?;
        }
    }

    Ok(format!("{}\n", parts.join("\n\n").trim_end()))
}

fn load_variables(
    src: &TemplateSource,
    rel_dir: &str,
    vspec: &VariantSpec,
) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    let Some(vfile) = &vspec.variables else {
        return Ok(vars);
    };
    let rel = format!("{rel_dir}/{vfile}");
    if !src.exists(&rel) {
        return Ok(vars);
    }
    let raw = src.read_file(&rel)?;
    let parsed: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&raw)?;
    for (key, value) in parsed {
        let text = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            _ => continue,
        };
        vars.insert(key, text);
    }
    Ok(vars)
}

fn read_section(
    src: &TemplateSource,
    rel_dir: &str,
    variant: &str,
    vspec: &VariantSpec,
    name: &str,
) -> Result<Option<String>> {
    if let Some(file) = vspec.overrides.get(name) {
        let rel = format!("{rel_dir}/{file}");
        if src.exists(&rel) {
            return Ok(Some(src.read_file(&rel)?));
        }
    }
    let variant_rel = format!("{rel_dir}/{variant}/{name}.md");
    if src.exists(&variant_rel) {
        return Ok(Some(src.read_file(&variant_rel)?));
    }
    let shared_rel = format!("{rel_dir}/sections/{name}.md");
    if src.exists(&shared_rel) {
        return Ok(Some(src.read_file(&shared_rel)?));
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
