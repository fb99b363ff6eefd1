//! Char-level diff with efficiency cleanup.
//!
//! [`char_diff`] runs Myers' algorithm over chars and coalesces the result
//! into runs. [`cleanup_efficiency`] then trades fidelity for fewer edits:
//! a short equality sandwiched between edits is cheaper to express as part
//! of them than as two separate edits, with "short" governed by `edit_cost`.
//! [`cleanup_merge`] normalizes the run list afterwards (adjacent runs of the
//! same kind merged, common affixes of replacements factored out, single
//! edits slid sideways to absorb equalities).

use macrorec_core::text::{char_len, common_prefix_len, common_suffix_len};
use similar::{Algorithm, ChangeTag, TextDiff};

/// Kind of a diff run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Text present in both versions.
    Equal,
    /// Text only in the new version.
    Insert,
    /// Text only in the old version.
    Delete,
}

/// A run of text with one [`Op`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff {
    /// Run kind.
    pub op: Op,
    /// Run text.
    pub text: String,
}

impl Diff {
    fn new(op: Op, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }
}

impl From<ChangeTag> for Op {
    fn from(tag: ChangeTag) -> Self {
        match tag {
            ChangeTag::Equal => Self::Equal,
            ChangeTag::Insert => Self::Insert,
            ChangeTag::Delete => Self::Delete,
        }
    }
}

/// Myers diff of `before` and `after` over chars, as normalized runs.
pub fn char_diff(before: &str, after: &str) -> Vec<Diff> {
    if before == after {
        return if before.is_empty() {
            Vec::new()
        } else {
            vec![Diff::new(Op::Equal, before)]
        };
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(before, after);

    let mut diffs: Vec<Diff> = Vec::new();
    for change in diff.iter_all_changes() {
        let op = Op::from(change.tag());
        match diffs.last_mut() {
            Some(last) if last.op == op => last.text.push_str(change.value()),
            _ => diffs.push(Diff::new(op, change.value())),
        }
    }
    cleanup_merge(&mut diffs);
    diffs
}

/// Fold short equalities between edits into those edits.
///
/// An equality shorter than `edit_cost` chars surrounded by an insertion and
/// a deletion on both sides is always folded. One shorter than half of
/// `edit_cost` is folded when three of the four sides carry edits.
pub fn cleanup_efficiency(diffs: &mut Vec<Diff>, edit_cost: usize) {
    let mut changes = false;
    // Indices of candidate equalities, most recent last.
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer = 0;
    // Edits seen before / after the last candidate equality.
    let mut pre_ins = false;
    let mut pre_del = false;
    let mut post_ins = false;
    let mut post_del = false;

    while pointer < diffs.len() {
        if diffs[pointer].op == Op::Equal {
            if char_len(&diffs[pointer].text) < edit_cost && (post_ins || post_del) {
                equalities.push(pointer);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(diffs[pointer].text.clone());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if diffs[pointer].op == Op::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            let sides = [pre_ins, pre_del, post_ins, post_del]
                .iter()
                .filter(|side| **side)
                .count();
            let fold = last_equality.as_ref().is_some_and(|equality| {
                sides == 4 || (char_len(equality) < edit_cost / 2 && sides == 3)
            });

            if let (true, Some(&at)) = (fold, equalities.last()) {
                let text = last_equality.take().unwrap_or_default();
                diffs.insert(at, Diff::new(Op::Delete, text));
                diffs[at + 1].op = Op::Insert;
                let _ = equalities.pop();
                changes = true;

                if pre_ins && pre_del {
                    // Nothing before the fold can change; keep scanning.
                    post_ins = true;
                    post_del = true;
                    equalities.clear();
                } else {
                    let _ = equalities.pop();
                    post_ins = false;
                    post_del = false;
                    if let Some(&previous) = equalities.last() {
                        pointer = previous;
                    } else {
                        pointer = 0;
                        continue;
                    }
                }
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
}

/// Normalize a run list until no sideways shift applies.
pub fn cleanup_merge(diffs: &mut Vec<Diff>) {
    loop {
        merge_runs(diffs);
        if !shift_single_edits(diffs) {
            break;
        }
    }
}

/// Merge adjacent runs and factor common affixes out of replacements.
fn merge_runs(diffs: &mut Vec<Diff>) {
    // Sentinel equality flushes the trailing edit group.
    diffs.push(Diff::new(Op::Equal, ""));
    let mut pointer = 0;
    let mut count_delete = 0;
    let mut count_insert = 0;
    let mut text_delete = String::new();
    let mut text_insert = String::new();

    while pointer < diffs.len() {
        match diffs[pointer].op {
            Op::Insert => {
                count_insert += 1;
                text_insert.push_str(&diffs[pointer].text);
                pointer += 1;
            }
            Op::Delete => {
                count_delete += 1;
                text_delete.push_str(&diffs[pointer].text);
                pointer += 1;
            }
            Op::Equal => {
                if count_delete + count_insert > 1 {
                    if count_delete != 0 && count_insert != 0 {
                        let common = common_prefix_len(&text_insert, &text_delete);
                        if common != 0 {
                            let prefix = text_insert[..common].to_owned();
                            let first = pointer - count_delete - count_insert;
                            if first > 0 && diffs[first - 1].op == Op::Equal {
                                diffs[first - 1].text.push_str(&prefix);
                            } else {
                                diffs.insert(0, Diff::new(Op::Equal, prefix));
                                pointer += 1;
                            }
                            let _ = text_insert.drain(..common);
                            let _ = text_delete.drain(..common);
                        }
                        let common = common_suffix_len(&text_insert, &text_delete);
                        if common != 0 {
                            let suffix = text_insert[text_insert.len() - common..].to_owned();
                            diffs[pointer].text.insert_str(0, &suffix);
                            text_insert.truncate(text_insert.len() - common);
                            text_delete.truncate(text_delete.len() - common);
                        }
                    }

                    let mut merged = Vec::with_capacity(2);
                    if !text_delete.is_empty() {
                        merged.push(Diff::new(Op::Delete, std::mem::take(&mut text_delete)));
                    }
                    if !text_insert.is_empty() {
                        merged.push(Diff::new(Op::Insert, std::mem::take(&mut text_insert)));
                    }
                    let first = pointer - count_delete - count_insert;
                    let added = merged.len();
                    let _ = diffs.splice(first..pointer, merged);
                    pointer = first + added + 1;
                } else if pointer != 0 && diffs[pointer - 1].op == Op::Equal {
                    let text = diffs.remove(pointer).text;
                    diffs[pointer - 1].text.push_str(&text);
                } else {
                    pointer += 1;
                }
                count_insert = 0;
                count_delete = 0;
                text_delete.clear();
                text_insert.clear();
            }
        }
    }

    if diffs.last().is_some_and(|d| d.text.is_empty()) {
        let _ = diffs.pop();
    }
}

/// Slide single edits between equalities to absorb one of them.
///
/// `A<ins>BA</ins>C` becomes `<ins>AB</ins>AC`. Returns whether anything moved.
fn shift_single_edits(diffs: &mut Vec<Diff>) -> bool {
    let mut changes = false;
    let mut pointer = 1;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].op == Op::Equal && diffs[pointer + 1].op == Op::Equal {
            let previous = diffs[pointer - 1].text.clone();
            let next = diffs[pointer + 1].text.clone();
            let current = &diffs[pointer].text;

            if current.ends_with(previous.as_str()) {
                if !previous.is_empty() {
                    let body = &current[..current.len() - previous.len()];
                    let shifted = format!("{previous}{body}");
                    diffs[pointer].text = shifted;
                    diffs[pointer + 1].text = format!("{previous}{next}");
                }
                let _ = diffs.remove(pointer - 1);
                changes = true;
            } else if current.starts_with(next.as_str()) {
                let shifted = format!("{}{next}", &current[next.len()..]);
                diffs[pointer].text = shifted;
                diffs[pointer - 1].text.push_str(&next);
                let _ = diffs.remove(pointer + 1);
                changes = true;
            }
        }
        pointer += 1;
    }
    changes
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
