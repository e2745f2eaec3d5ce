//! Template helper functions
//!
//! Template-name normalization shared by the directives, the engine and the
//! CLI.

/// Convert a path-like template reference to dotted notation
///
/// Both `/` and `\` separate segments.
///
/// ```rust
/// use snap_blade::template::helpers::bladeify;
///
/// assert_eq!(bladeify("partials/post-type\\page"), "partials.post-type.page");
/// ```
#[must_use]
pub fn bladeify(name: &str) -> String {
    name.replace(['/', '\\'], ".")
}

/// Dotted name of the view for a theme file slug
///
/// The templates directory prefix and `extension` are stripped, and `views.`
/// is prepended unless the slug already lives under `views/`.
#[must_use]
pub fn template_name(slug: &str, templates_directory: &str, extension: &str) -> String {
    let mut name = slug.trim_start_matches(['/', '\\']);
    let directory = templates_directory.trim_matches(['/', '\\']);
    if !directory.is_empty() {
        if let Some(rest) = name.strip_prefix(directory) {
            if rest.starts_with(['/', '\\']) {
                name = rest.trim_start_matches(['/', '\\']);
            }
        }
    }
    let name = name.strip_suffix(extension).unwrap_or(name);
    let name = name.strip_suffix(".php").unwrap_or(name);

    if name.starts_with("views/") || name.starts_with("views\\") {
        bladeify(name)
    } else {
        format!("views.{}", bladeify(name))
    }
}

/// Dotted name of a partial for a slug such as `header/primary`
#[must_use]
pub fn partial_name(slug: &str) -> String {
    let slug = slug.trim_matches(['/', '\\']);
    let slug = slug.strip_prefix("partials/").unwrap_or(slug);
    format!("partials.{}", bladeify(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_name() {
        assert_eq!(template_name("index", "templates", ".blade.html"), "views.index");
        assert_eq!(
            template_name("templates/single.blade.html", "templates", ".blade.html"),
            "views.single"
        );
        assert_eq!(
            template_name("views/archive/post", "templates", ".blade.html"),
            "views.archive.post"
        );
        assert_eq!(template_name("page.php", "templates", ".blade.html"), "views.page");
    }

    #[test]
    fn test_template_name_keeps_lookalike_prefix() {
        assert_eq!(
            template_name("templatesque", "templates", ".blade.html"),
            "views.templatesque"
        );
    }

    #[test]
    fn test_partial_name() {
        assert_eq!(partial_name("header/primary"), "partials.header.primary");
        assert_eq!(partial_name("partials/footer"), "partials.footer");
    }
}
