//! Stylesheet and toggle injection for served documents.
//!
//! Works on raw text rather than the typed tree so untouched markup is
//! returned byte for byte.

use crate::config::ThemeConfig;
use crate::error::{CoreError, Result};
use regex::{Captures, Regex};

const FONT_LINKS: &str = r#"<link rel="preconnect" href="https://fonts.googleapis.com">
<link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
<link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700;800&display=swap" rel="stylesheet">
"#;

const TOGGLE_SCRIPT: &str = r#"<script data-linkmend-toggle>
(function(){
    const btn=document.createElement('button');
    btn.textContent='Theme: ON';
    Object.assign(btn.style,{
        position:'fixed',right:'12px',top:'12px',zIndex:99999,
        background:'#111827',color:'#fff',border:'1px solid #374151',
        borderRadius:'10px',padding:'6px 10px',fontSize:'12px',cursor:'pointer'
    });
    btn.onclick=function(){
        const u=new URL(location.href);
        u.searchParams.set('theme','off');
        location.href=u.toString();
    };
    document.body.appendChild(btn);
})();
</script>
"#;

pub struct ThemeInjector {
    config: ThemeConfig,
    body_tag: Regex,
}

impl ThemeInjector {
    pub fn new(config: ThemeConfig) -> Result<Self> {
        let body_tag = Regex::new(r"(?i)<body([^>]*)>").map_err(|e| CoreError::Config(e.to_string()))?;
        Ok(Self { config, body_tag })
    }

    fn stylesheet_link(&self) -> String {
        format!(r#"<link rel="stylesheet" href="{}">"#, self.config.stylesheet)
    }

    /// Inject the stylesheet, body attribute and toggle script. Each piece is
    /// skipped when already present.
    pub fn inject(&self, html: &str) -> String {
        let mut out = html.to_string();

        if !out.contains(&self.stylesheet_link()) {
            let mut head = String::new();
            if self.config.fonts {
                head.push_str(FONT_LINKS);
            }
            head.push_str(&self.stylesheet_link());
            head.push('\n');
            out = match find_ignore_case(&out, "</head>") {
                Some(idx) => format!("{}{}{}", &out[..idx], head, &out[idx..]),
                None => format!("{}{}", head, out),
            };
        }

        let attribute = format!(r#"{}="{}""#, self.config.attribute, self.config.attribute_value);
        if self.body_tag.is_match(&out) {
            if !out.contains(&format!("{}=", self.config.attribute)) {
                out = self
                    .body_tag
                    .replace(&out, |caps: &Captures| format!("<body{} {}>", &caps[1], attribute))
                    .into_owned();
            }
        } else {
            out = format!("<body {}>{}</body>", attribute, out);
        }

        if !out.contains("data-linkmend-toggle") {
            out = match find_ignore_case(&out, "</body>") {
                Some(idx) => format!("{}{}{}", &out[..idx], TOGGLE_SCRIPT, &out[idx..]),
                None => format!("{}{}", out, TOGGLE_SCRIPT),
            };
        }

        out
    }

    /// `inject` when enabled, the input unchanged otherwise.
    pub fn render(&self, html: &str, enabled: bool) -> String {
        if enabled { self.inject(html) } else { html.to_string() }
    }
}

/// Theme is on unless the query string carries `theme=off`.
pub fn theme_enabled(query: Option<&str>) -> bool {
    let Some(query) = query else {
        return true;
    };
    !query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key == "theme" && value.eq_ignore_ascii_case("off"))
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}
