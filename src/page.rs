//! Landing page HTML
//!
//! The whole UI is one page: the plot form, an optional flash banner
//! and, after a successful plot, the rendered image with a download
//! link. Assembled with format! - a single page does not justify a
//! template engine.

/// Render the landing page.
///
/// `flash` becomes a banner above the form (HTML-escaped, it carries
/// user-derived error text). `plot_b64` embeds the rendered PNG inline
/// and adds the download link.
pub fn index(flash: Option<&str>, plot_b64: Option<&str>) -> String {
    let banner = match flash {
        Some(message) => format!("<p class=\"flash\">{}</p>\n", escape_html(message)),
        None => String::new(),
    };

    let plot_section = match plot_b64 {
        Some(encoded) => format!(
            r#"<div class="plot">
<img src="data:image/png;base64,{encoded}" alt="plot">
<p><a href="/download">Download PNG</a></p>
</div>
"#
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>Expression Plotter</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
.flash {{ color: #a00; border: 1px solid #a00; padding: 0.5em; }}
label {{ display: inline-block; margin: 0.2em 0; }}
</style>
</head>
<body>
<h1>Expression Plotter</h1>
{banner}<form action="/plot" method="get">
<label>Mode:
<select name="mode">
<option value="function">function</option>
<option value="parametric">parametric</option>
<option value="polar">polar</option>
</select>
</label><br>
<label>expr_x: <input type="text" name="expr_x" placeholder="sin(x)"></label><br>
<label>expr_y: <input type="text" name="expr_y" placeholder="parametric only"></label><br>
<label>expr_r: <input type="text" name="expr_r" placeholder="polar only"></label><br>
<label>xmin: <input type="text" name="xmin" placeholder="-10"></label>
<label>xmax: <input type="text" name="xmax" placeholder="10"></label>
<label>points: <input type="text" name="points" placeholder="1000"></label><br>
<button type="submit">Plot</button>
</form>
{plot_section}</body>
</html>
"#
    )
}

/// Replace the five characters that break out of HTML text context.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_page_has_form_and_no_image() {
        let html = index(None, None);
        assert!(html.contains("<form action=\"/plot\""));
        assert!(html.contains("name=\"mode\""));
        assert!(html.contains("name=\"expr_x\""));
        assert!(html.contains("name=\"points\""));
        assert!(!html.contains("data:image/png"));
        assert!(!html.contains("class=\"flash\""));
    }

    #[test]
    fn test_flash_banner_is_escaped() {
        let html = index(Some("unknown symbol '<y>'"), None);
        assert!(html.contains("class=\"flash\""));
        assert!(html.contains("unknown symbol &#39;&lt;y&gt;&#39;"));
        assert!(!html.contains("<y>"));
    }

    #[test]
    fn test_plot_section_embeds_image_and_download_link() {
        let html = index(None, Some("QUJD"));
        assert!(html.contains("data:image/png;base64,QUJD"));
        assert!(html.contains("href=\"/download\""));
    }

    #[test]
    fn test_escape_html_all_entities() {
        assert_eq!(
            escape_html(r#"<a href="x">&'b'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;b&#39;&lt;/a&gt;"
        );
    }
}
