use std::fmt::Write as _;

use crate::config::Config;

/// Where the stylesheet finds each font format, relative to itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontReferences {
    pub eot: Option<String>,
    pub woff: Option<String>,
    pub svg: Option<String>,
    pub ttf: Option<String>,
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// The `src` descriptor list, most preferred format first.
fn sources(references: &FontReferences) -> Vec<String> {
    let mut src = Vec::new();
    if let Some(eot) = &references.eot {
        src.push("local(\"*\")".to_string());
        src.push(format!(
            "url({}) format(\"embedded-opentype\")",
            quote(&format!("{}?#iefix", eot))
        ));
    }
    if let Some(woff) = &references.woff {
        src.push(format!("url({}) format(\"woff\")", quote(woff)));
    }
    if let Some(svg) = &references.svg {
        src.push(format!("url({}) format(\"svg\")", quote(svg)));
    }
    if let Some(ttf) = &references.ttf {
        src.push(format!("url({}) format(\"truetype\")", quote(ttf)));
    }
    src
}

/// Renders the stylesheet: `@font-face`, the shared base rule and one
/// `:before` rule per glyph, in configuration order.
pub fn render(config: &Config, references: &FontReferences) -> String {
    let font = &config.font;
    let prefix = &font.prefix;
    let family = quote(&font.name);
    let label = font
        .css
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let mut css = String::new();
    css.push_str("/*\n");
    let _ = writeln!(css, "**  {} -- Web Font Embedding Stylesheet", label);
    css.push_str("**  Generated by Glyphs2Font <https://github.com/rse/glyphs2font>\n");
    css.push_str("*/\n\n");

    css.push_str("@font-face {\n");
    let _ = writeln!(css, "    font-family:     {};", family);
    if let Some(eot) = &references.eot {
        let _ = writeln!(css, "    src:             url({});", quote(eot));
    }
    let src = sources(references);
    if !src.is_empty() {
        let _ = writeln!(css, "    src:             {};", src.join(",\n                     "));
    }
    css.push_str("    font-style:      normal;\n");
    css.push_str("    font-weight:     normal;\n");
    css.push_str("    font-stretch:    normal;\n");
    css.push_str("    font-variant:    normal;\n");
    css.push_str("}\n\n");

    let _ = writeln!(css, "[class^=\"{}-\"]:before,", prefix);
    let _ = writeln!(css, "[class*=\" {}-\"]:before {{", prefix);
    let _ = writeln!(css, "    font-family:     {};", family);
    for line in [
        "font-style:      normal;",
        "font-weight:     normal;",
        "font-stretch:    normal;",
        "font-variant:    normal;",
        "font-size:       inherit;",
        "text-rendering:  auto;",
        "display:         inline-block;",
        "transform:       translate(0, 0);",
        "speak:           none;",
        "text-decoration: inherit;",
        "text-align:      center;",
        "text-transform:  none;",
        "-webkit-font-smoothing:  antialiased;",
        "-moz-osx-font-smoothing: grayscale;",
    ] {
        let _ = writeln!(css, "    {}", line);
    }
    css.push_str("}\n\n");

    for glyph in &config.glyphs {
        let _ = writeln!(
            css,
            ".{}-{}:before {{ content: \"\\{:x}\"; }}",
            prefix, glyph.name, glyph.code
        );
    }
    css.push('\n');
    css
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        Config::from_yaml(
            r#"
font:
  name: Icons
  css: css/icons.css
glyphs:
  - { name: home, code: 0xE001, glyph: home.svg }
  - { name: star, code: 0xF00A, glyph: star.svg }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_glyph_rules_in_order() {
        let css = render(&config(), &FontReferences::default());
        let home = css
            .find(".icon-home:before { content: \"\\e001\"; }")
            .unwrap();
        let star = css
            .find(".icon-star:before { content: \"\\f00a\"; }")
            .unwrap();
        assert!(home < star);
        assert_eq!(css.matches("content:").count(), 2);
        assert!(css.contains("**  css/icons.css -- Web Font Embedding Stylesheet\n"));
        assert!(css.contains("[class^=\"icon-\"]:before,\n[class*=\" icon-\"]:before {\n"));
    }

    #[test]
    fn test_sources_with_all_formats() {
        let references = FontReferences {
            eot: Some("../fonts/icons.eot".to_string()),
            woff: Some("../fonts/icons.woff".to_string()),
            svg: Some("../fonts/icons.svg".to_string()),
            ttf: Some("../fonts/icons.ttf".to_string()),
        };
        let css = render(&config(), &references);
        let expected = concat!(
            "@font-face {\n",
            "    font-family:     \"Icons\";\n",
            "    src:             url(\"../fonts/icons.eot\");\n",
            "    src:             local(\"*\"),\n",
            "                     url(\"../fonts/icons.eot?#iefix\") format(\"embedded-opentype\"),\n",
            "                     url(\"../fonts/icons.woff\") format(\"woff\"),\n",
            "                     url(\"../fonts/icons.svg\") format(\"svg\"),\n",
            "                     url(\"../fonts/icons.ttf\") format(\"truetype\");\n",
            "    font-style:      normal;\n",
        );
        assert!(css.contains(expected), "{}", css);
    }

    #[test]
    fn test_sources_without_eot() {
        let references = FontReferences {
            woff: Some("icons.woff".to_string()),
            ..Default::default()
        };
        let css = render(&config(), &references);
        assert!(css.contains("    src:             url(\"icons.woff\") format(\"woff\");\n"));
        assert!(!css.contains("local("));
        assert!(!css.contains("embedded-opentype"));
    }
}
