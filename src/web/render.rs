use std::fmt::Write as _;

use serde_json::Value;

/// Turns a template name and its context into an HTML document.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> anyhow::Result<String>;
}

/// Generic page: navigation, flash messages and the context as escaped JSON.
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, template: &str, context: &Value) -> anyhow::Result<String> {
        let mut out = String::with_capacity(2048);
        write!(
            out,
            "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>WeFit | {}</title></head>\n<body data-template=\"{}\">\n",
            escape(template),
            escape(template)
        )?;

        out.push_str("<nav>");
        for (href, label) in nav_links(context.get("uid").and_then(Value::as_i64)) {
            write!(out, "<a href=\"{}\">{}</a> ", escape(&href), label)?;
        }
        out.push_str("</nav>\n");

        if let Some(flashes) = context.get("flashes").and_then(Value::as_array) {
            out.push_str("<ul class=\"flashes\">");
            for flash in flashes {
                let level = flash.get("level").and_then(Value::as_str).unwrap_or("info");
                let message = flash.get("message").and_then(Value::as_str).unwrap_or("");
                write!(
                    out,
                    "<li class=\"flash-{}\">{}</li>",
                    escape(level),
                    escape(message)
                )?;
            }
            out.push_str("</ul>\n");
        }

        let body = serde_json::to_string_pretty(context)?;
        write!(out, "<main><pre>{}</pre></main>\n</body>\n</html>\n", escape(&body))?;
        Ok(out)
    }
}

fn nav_links(uid: Option<i64>) -> Vec<(String, &'static str)> {
    match uid {
        Some(uid) => vec![
            ("/".into(), "Home"),
            ("/schedules".into(), "Schedules"),
            (format!("/meals/{uid}"), "Meals"),
            ("/foods".into(), "Foods"),
            (format!("/meds/{uid}"), "Medications"),
            ("/users".into(), "Users"),
            ("/logout".into(), "Log out"),
        ],
        None => vec![
            ("/welcome".into(), "Welcome"),
            ("/login".into(), "Log in"),
            ("/register".into(), "Register"),
        ],
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
