//! Rendering a template directory from a fixture file

use std::fs;
use std::path::Path;

use snap_blade::config::SnapConfig;
use snap_blade_cli_lib::commands::{CheckCommand, RenderCommand};
use snap_blade_cli_lib::{apply_template_dirs, build_engine, Fixture};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn theme() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "views/index.blade.html",
        "@wphead<ul>@simplemenu('primary' as $item)<li>{{ item.label }}</li>@endsimplemenu</ul>\n\
         @loop<h2>{{ post.title }}</h2>@endloop\n\
         @can('edit_posts')<a>edit</a>@endcan\n\
         @paginate({'current': 2})",
    );
    write(
        dir.path(),
        "partials/pagination.blade.html",
        "<nav>{{ site }} page {{ pagination.current }}</nav>",
    );
    dir
}

fn fixture(dir: &Path) -> Fixture {
    let path = dir.join("fixture.json");
    fs::write(
        &path,
        r#"{
            "defaults": {"partials.*": {"site": "Example"}},
            "query": [{"title": "One"}, {"title": "Two"}],
            "menus": {"primary": [{"label": "Home"}, {"label": "About"}]},
            "permissions": ["edit_posts"],
            "procedures": {"wphead": "<meta>"}
        }"#,
    )
    .unwrap();
    Fixture::load(&path).unwrap()
}

fn config(dir: &Path) -> SnapConfig {
    let mut config = SnapConfig::default();
    apply_template_dirs(&mut config, &[dir.to_path_buf()]);
    config
}

#[test]
fn test_render_theme_from_fixture() {
    let dir = theme();
    let fixture = fixture(dir.path());
    let engine = build_engine(&config(dir.path()), &fixture);

    let output = RenderCommand {
        name: "views.index".into(),
        data: fixture.data.clone(),
        view: false,
    }
    .execute(&engine)
    .unwrap();

    assert_eq!(
        output,
        "<meta><ul><li>Home</li><li>About</li></ul>\n\
         <h2>One</h2><h2>Two</h2>\n\
         <a>edit</a>\n\
         <nav>Example page 2</nav>"
    );
}

#[test]
fn test_unknown_menu_fails_the_render() {
    let dir = theme();
    let engine = build_engine(&config(dir.path()), &Fixture::default());

    let err = RenderCommand {
        name: "views.index".into(),
        data: Default::default(),
        view: false,
    }
    .execute(&engine)
    .unwrap_err();
    assert!(format!("{err:#}").contains("no menu named `primary`"));
}

#[test]
fn test_theme_without_pagination_partial() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "views/index.blade.html", "[@paginate]");
    let engine = build_engine(&config(dir.path()), &Fixture::default());

    let output = RenderCommand {
        name: "views.index".into(),
        data: Default::default(),
        view: false,
    }
    .execute(&engine)
    .unwrap();
    assert_eq!(output, "[]");
}

#[test]
fn test_check_reports_broken_templates() {
    let dir = theme();
    write(dir.path(), "views/broken.blade.html", "@endloop");
    let engine = build_engine(&config(dir.path()), &Fixture::default());

    let report = CheckCommand.execute(&engine).unwrap();
    assert_eq!(report.total(), 3);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "views.broken");
}
