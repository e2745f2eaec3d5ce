//! Render a small theme from memory with a custom host and directive
//!
//! Run with: `cargo run --example render_theme`

use std::sync::Arc;

use serde_json::{json, Value};
use snap_blade::observability::{self, LoggingConfig};
use snap_blade::prelude::*;

struct BlogHost;

impl ThemeHost for BlogHost {
    fn current_query(&self, _ctx: &RenderContext<'_>) -> anyhow::Result<Value> {
        Ok(json!([
            {"title": "Hello world", "post_type": "post"},
            {"title": "About us", "post_type": "page"},
        ]))
    }

    fn nav_menu(&self, _ctx: &RenderContext<'_>, _menu: &Value) -> anyhow::Result<Value> {
        Ok(json!([{"label": "Home", "url": "/"}, {"label": "Blog", "url": "/blog"}]))
    }

    fn invoke(
        &self,
        ctx: &RenderContext<'_>,
        name: &str,
        _args: &[Value],
    ) -> anyhow::Result<String> {
        Ok(match name {
            "wphead" => format!("<title>{}</title>", ctx.current_view().unwrap_or("blog")),
            _ => String::new(),
        })
    }
}

fn main() -> anyhow::Result<()> {
    observability::init(&LoggingConfig::verbose(true))?;

    let loader = MemoryLoader::new()
        .with(
            "views.index",
            "@wphead\n\
             <nav>@simplemenu('primary' as $item)<a href=\"{{ item.url }}\">{{ item.label }}</a>@endsimplemenu</nav>\n\
             @loop\n  @posttypepartial\n@endloop\n\
             @year",
        )
        .with("partials.post-type.post", "<article>{{ post.title }} ({{ blade_loop.iteration }}/{{ blade_loop.count }})</article>")
        .with("partials.post-type.page", "<section>{{ post.title }}</section>");

    let engine = BladeEngine::builder()
        .loader(Arc::new(loader))
        .host(Arc::new(BlogHost))
        .build();
    engine.register_directive(Directive::new("year", |_| Ok("&copy; 2026".to_string())));

    let html = engine.render_view("index", &ViewData::new())?;
    println!("{html}");
    Ok(())
}
