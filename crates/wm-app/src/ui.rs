use crate::config::Profile;

const PAGE: &str = include_str!("../assets/index.html");

/// The single UI page, with the sections of model families the profile
/// does not serve cut out.
pub fn render(profile: Profile) -> String {
    let page = PAGE.replace("{{TITLE}}", profile.title());
    let page = section(&page, "HUNYUAN", profile.has_hunyuan());
    section(&page, "WORLDGEN", profile.has_worldgen())
}

/// Keep or drop everything between `<!--NAME-->` and `<!--/NAME-->`
fn section(page: &str, name: &str, keep: bool) -> String {
    let open = format!("<!--{}-->", name);
    let close = format!("<!--/{}-->", name);

    let mut out = String::with_capacity(page.len());
    let mut rest = page;
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        let inner = &rest[start + open.len()..];
        let Some(end) = inner.find(&close) else {
            // unterminated marker, leave the remainder alone
            out.push_str(&rest[start..]);
            return out;
        };
        if keep {
            out.push_str(&inner[..end]);
        }
        rest = &inner[end + close.len()..];
    }
    out.push_str(rest);
    out
}
