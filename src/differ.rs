use diffy::{DiffOptions,PatchFormatter};

pub const DEFAULT_CONTEXT: usize = 3;

/** Formatting settings for a unified diff */
#[derive(Clone,Copy,Debug)]
pub struct DiffStyle {
    pub context: usize,
    pub colour: bool
}

impl Default for DiffStyle {
    fn default() -> DiffStyle {
        DiffStyle{context: DEFAULT_CONTEXT, colour: false}
    }
}

/**
 * Unified diff from `baseline` to `current`, with the given labels on the
 * `---`/`+++` lines. Returns None when the texts are identical.
 */
pub fn diff(baseline: &str, current: &str, baseline_label: &str, current_label: &str, style: DiffStyle) -> Option<String> {
    if baseline == current {
        return None
    }
    let baseline = with_final_newline(baseline);
    let current = with_final_newline(current);
    let patch = DiffOptions::new()
        .set_context_len(style.context)
        .create_patch(&baseline,&current);
    let mut f = PatchFormatter::new();
    if style.colour { f = f.with_color() }
    let body = f.fmt_patch(&patch).to_string();
    // replace diffy's own "--- original" / "+++ modified" header lines
    let hunks: String = body.split_inclusive('\n').skip_while(|l| !l.contains("@@ -")).collect();
    Some(format!("--- {}\n+++ {}\n{}",baseline_label,current_label,hunks))
}

/** Both sides must agree on the last line, or a spurious change appears */
fn with_final_newline(text: &str) -> String {
    let mut text = text.to_string();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
