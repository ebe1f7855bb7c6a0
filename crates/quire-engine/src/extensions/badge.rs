//! Inline badge: a pill-styled run of text, excluded from inline code.

use super::{Extension, shared};
use crate::commands::{Command, toggle_mark};

pub const MARK: &str = "badge";

pub const EXTENSION: Extension = Extension {
    name: "badge",
    priority: 0,
    bindings: |_| vec![("Mod-Shift-b", shared(toggle_badge()))],
};

/// Wrap or unwrap the selection in a badge.
pub fn toggle_badge() -> impl Command {
    toggle_mark(MARK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn toggles_badge_over_selection() {
        let state = state("<p>New feature</p>", 1, 4);
        let badged = run(&state, toggle_badge());
        assert_eq!(html(&badged), r#"<p><span data-badge="">New</span> feature</p>"#);
        assert_eq!(html(&run(&badged, toggle_badge())), "<p>New feature</p>");
    }

    #[test]
    fn badge_does_not_attach_to_inline_code() {
        let state = state("<p><code>npm</code></p>", 1, 4);
        assert_eq!(html(&run(&state, toggle_badge())), "<p><code>npm</code></p>");
    }
}
