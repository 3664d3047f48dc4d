use comrak::options::Options;

/// Parser and renderer options shared by post bodies and replies.
///
/// Raw HTML is always emitted by the renderer; reply input has its HTML
/// nodes escaped during the AST rewrite instead.
pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.cjk_friendly_emphasis = true;

    let render = &mut options.render;
    render.r#unsafe = true;
    render.sourcepos = false;
}
