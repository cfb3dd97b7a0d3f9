use std::fmt::Write as _;

use crate::{config::Config, emitters::escape_html};

/// Renders the preview page. `stylesheet` is the CSS location relative to
/// the page; without one the page carries no `<link>`.
pub fn render(config: &Config, stylesheet: Option<&str>) -> String {
    let name = escape_html(&config.font.name);
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n");
    html.push_str("<html>\n");
    html.push_str("    <head>\n");
    let _ = writeln!(html, "        <title>{}</title>", name);
    html.push_str("        <style type=\"text/css\">\n");
    html.push_str("            body               { font-size: 16pt; font-family: sans-serif; margin: 40px; }\n");
    html.push_str("            .sample            { width: 100%; }\n");
    html.push_str("            .sample .icon      { width: 20%;  display: inline-block; float: left; }\n");
    html.push_str("            .sample .icon i    { width: 20%;  display: inline-block; color: #cc3333; }\n");
    html.push_str("            .sample .icon span { width: auto; display: inline-block; }\n");
    html.push_str("        </style>\n");
    if let Some(href) = stylesheet {
        let _ = writeln!(
            html,
            "        <link href=\"{}\" rel=\"stylesheet\" type=\"text/css\"/>",
            escape_html(href)
        );
    }
    html.push_str("    </head>\n");
    html.push_str("    <body>\n");
    let _ = writeln!(html, "        <h1>{}</h1>", name);
    html.push_str("        <div class=\"sample\">\n");
    for glyph in &config.glyphs {
        let glyph_name = escape_html(&glyph.name);
        let _ = writeln!(
            html,
            "            <div class=\"icon\"><i class=\"{}-{}\"></i><span>{}</span></div>",
            escape_html(&config.font.prefix),
            glyph_name,
            glyph_name
        );
    }
    html.push_str("        </div>\n");
    html.push_str("    </body>\n");
    html.push_str("</html>\n");
    html
}
