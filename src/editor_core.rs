use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_cursor(self) -> bool {
        self.start == self.end
    }

    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChange {
    pub start: usize,
    pub end: usize,
    pub insert: String,
}

impl TextChange {
    pub fn new(start: usize, end: usize, insert: impl Into<String>) -> Self {
        Self {
            start,
            end,
            insert: insert.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    Toolbar,
    TagPicker,
    PageLink,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub change: TextChange,
    pub selection_after: Selection,
    pub origin: ChangeOrigin,
    pub label: &'static str,
}

impl Transaction {
    pub fn new(
        change: TextChange,
        selection_after: Selection,
        origin: ChangeOrigin,
        label: &'static str,
    ) -> Self {
        Self {
            change,
            selection_after,
            origin,
            label,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub text_changed: bool,
    pub selection_changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("{label}: change {start}..{end} is outside text of length {len}")]
    InvalidRange {
        label: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub text: String,
    pub selection: Selection,
}

impl EditorSnapshot {
    pub fn new(text: String) -> Self {
        let len = text.len();
        Self {
            text,
            selection: Selection::cursor(len),
        }
    }

    /// Snapshot of a textarea, whose selection is reported in UTF-16 units.
    pub fn from_field(text: String, start_utf16: u32, end_utf16: u32) -> Self {
        let start = utf16_to_byte(&text, start_utf16 as usize);
        let end = utf16_to_byte(&text, end_utf16 as usize);
        let mut snapshot = Self::new(text);
        snapshot.set_selection(Selection::new(start, end));
        snapshot
    }

    pub fn field_selection(&self) -> (u32, u32) {
        (
            byte_to_utf16(&self.text, self.selection.start) as u32,
            byte_to_utf16(&self.text, self.selection.end) as u32,
        )
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let clamped = selection.clamp(self.text.len());
        self.selection = Selection::new(
            floor_char_boundary(&self.text, clamped.start),
            floor_char_boundary(&self.text, clamped.end),
        );
    }

    pub fn apply_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<ApplyOutcome, CoreError> {
        let Transaction {
            change,
            selection_after,
            origin,
            label,
        } = transaction;
        check_range(&change, &self.text, label)?;

        let mut next_text = String::with_capacity(self.text.len() + change.insert.len());
        next_text.push_str(&self.text[..change.start]);
        next_text.push_str(&change.insert);
        next_text.push_str(&self.text[change.end..]);
        let next_selection = selection_after.clamp(next_text.len());

        let outcome = ApplyOutcome {
            text_changed: self.text != next_text,
            selection_changed: self.selection != next_selection,
        };
        debug!(?origin, label, start = change.start, end = change.end, "applied edit");

        self.text = next_text;
        self.selection = next_selection;
        Ok(outcome)
    }
}

fn check_range(change: &TextChange, text: &str, label: &'static str) -> Result<(), CoreError> {
    if change.start > change.end
        || change.end > text.len()
        || !text.is_char_boundary(change.start)
        || !text.is_char_boundary(change.end)
    {
        return Err(CoreError::InvalidRange {
            label,
            start: change.start,
            end: change.end,
            len: text.len(),
        });
    }
    Ok(())
}

// An offset inside a surrogate pair rounds up to the next char.
pub fn utf16_to_byte(text: &str, offset: usize) -> usize {
    let mut units = 0usize;
    for (idx, ch) in text.char_indices() {
        if units >= offset {
            return idx;
        }
        units += ch.len_utf16();
    }
    text.len()
}

pub fn byte_to_utf16(text: &str, offset: usize) -> usize {
    let end = floor_char_boundary(text, offset.min(text.len()));
    text[..end].encode_utf16().count()
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkdownCommand {
    Wrap {
        open: &'static str,
        close: &'static str,
        label: &'static str,
    },
    LinePrefix {
        prefix: &'static str,
        label: &'static str,
    },
    CodeBlock,
    InsertText(String),
    InsertTag(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolbarAction {
    Todo,
    Code,
    Quote,
    BulletList,
    NumberedList,
    Bold,
    Italic,
}

impl ToolbarAction {
    pub const ALL: [ToolbarAction; 7] = [
        ToolbarAction::Todo,
        ToolbarAction::Code,
        ToolbarAction::Quote,
        ToolbarAction::BulletList,
        ToolbarAction::NumberedList,
        ToolbarAction::Bold,
        ToolbarAction::Italic,
    ];

    pub fn command(self) -> MarkdownCommand {
        match self {
            ToolbarAction::Todo => MarkdownCommand::LinePrefix {
                prefix: "- [ ] ",
                label: "todo",
            },
            ToolbarAction::Code => MarkdownCommand::CodeBlock,
            ToolbarAction::Quote => MarkdownCommand::LinePrefix {
                prefix: "> ",
                label: "quote",
            },
            ToolbarAction::BulletList => MarkdownCommand::LinePrefix {
                prefix: "- ",
                label: "bullet-list",
            },
            ToolbarAction::NumberedList => MarkdownCommand::LinePrefix {
                prefix: "1. ",
                label: "numbered-list",
            },
            ToolbarAction::Bold => MarkdownCommand::Wrap {
                open: "**",
                close: "**",
                label: "bold",
            },
            ToolbarAction::Italic => MarkdownCommand::Wrap {
                open: "*",
                close: "*",
                label: "italic",
            },
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ToolbarAction::Todo => "Insert todo item",
            ToolbarAction::Code => "Insert code block",
            ToolbarAction::Quote => "Insert quote",
            ToolbarAction::BulletList => "Insert bullet list",
            ToolbarAction::NumberedList => "Insert numbered list",
            ToolbarAction::Bold => "Bold",
            ToolbarAction::Italic => "Italic",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            ToolbarAction::Todo => "☑",
            ToolbarAction::Code => "</>",
            ToolbarAction::Quote => "❝",
            ToolbarAction::BulletList => "•",
            ToolbarAction::NumberedList => "1.",
            ToolbarAction::Bold => "B",
            ToolbarAction::Italic => "I",
        }
    }
}

pub fn apply_markdown_command(
    snapshot: &mut EditorSnapshot,
    command: MarkdownCommand,
) -> Result<bool, CoreError> {
    let Some(transaction) = build_markdown_transaction(snapshot, command) else {
        return Ok(false);
    };
    let outcome = snapshot.apply_transaction(transaction)?;
    Ok(outcome.text_changed || outcome.selection_changed)
}

fn build_markdown_transaction(
    snapshot: &EditorSnapshot,
    command: MarkdownCommand,
) -> Option<Transaction> {
    match command {
        MarkdownCommand::Wrap { open, close, label } => {
            Some(wrap_transaction(snapshot, open, close, label))
        }
        MarkdownCommand::LinePrefix { prefix, label } => Some(line_start_insert(
            snapshot,
            prefix,
            ChangeOrigin::Toolbar,
            label,
        )),
        MarkdownCommand::CodeBlock => Some(code_block_transaction(snapshot)),
        MarkdownCommand::InsertText(text) => Some(replace_selection(snapshot, text)),
        MarkdownCommand::InsertTag(path) => {
            if path.is_empty() {
                return None;
            }
            let tag = if path.starts_with('#') {
                format!("{path} ")
            } else {
                format!("#{path} ")
            };
            Some(line_start_insert(
                snapshot,
                &tag,
                ChangeOrigin::TagPicker,
                "insert-tag",
            ))
        }
    }
}

fn wrap_transaction(
    snapshot: &EditorSnapshot,
    open: &str,
    close: &str,
    label: &'static str,
) -> Transaction {
    let selection = snapshot.selection.clamp(snapshot.text.len());
    let selected = &snapshot.text[selection.start..selection.end];
    let mut insert = String::new();
    insert.push_str(open);
    insert.push_str(selected);
    insert.push_str(close);
    let inner_start = selection.start + open.len();
    let selection_after = if selection.is_cursor() {
        Selection::cursor(inner_start)
    } else {
        // inner text stays selected
        Selection::new(inner_start, inner_start + selected.len())
    };
    Transaction::new(
        TextChange::new(selection.start, selection.end, insert),
        selection_after,
        ChangeOrigin::Toolbar,
        label,
    )
}

fn needs_line_break(text: &str, pos: usize) -> bool {
    pos > 0 && !text[..pos].ends_with('\n')
}

// Inserts at the selection start without replacing the selection.
fn line_start_insert(
    snapshot: &EditorSnapshot,
    text: &str,
    origin: ChangeOrigin,
    label: &'static str,
) -> Transaction {
    let selection = snapshot.selection.clamp(snapshot.text.len());
    let mut insert = String::new();
    if needs_line_break(&snapshot.text, selection.start) {
        insert.push('\n');
    }
    insert.push_str(text);
    let caret = selection.start + insert.len();
    Transaction::new(
        TextChange::new(selection.start, selection.start, insert),
        Selection::cursor(caret),
        origin,
        label,
    )
}

fn code_block_transaction(snapshot: &EditorSnapshot) -> Transaction {
    const FENCE_OPEN: &str = "```\n";
    let selection = snapshot.selection.clamp(snapshot.text.len());
    let selected = &snapshot.text[selection.start..selection.end];
    let lead = if needs_line_break(&snapshot.text, selection.start) {
        "\n"
    } else {
        ""
    };
    let body_start = selection.start + lead.len() + FENCE_OPEN.len();

    let (change, selection_after) = if selection.is_cursor() {
        (
            TextChange::new(
                selection.start,
                selection.start,
                format!("{lead}{FENCE_OPEN}\n```"),
            ),
            Selection::cursor(body_start),
        )
    } else {
        (
            TextChange::new(
                selection.start,
                selection.end,
                format!("{lead}{FENCE_OPEN}{selected}\n```"),
            ),
            Selection::new(body_start, body_start + selected.len()),
        )
    };
    Transaction::new(
        change,
        selection_after,
        ChangeOrigin::Toolbar,
        "code-block",
    )
}

fn replace_selection(snapshot: &EditorSnapshot, text: String) -> Transaction {
    let selection = snapshot.selection.clamp(snapshot.text.len());
    let caret = selection.start + text.len();
    Transaction::new(
        TextChange::new(selection.start, selection.end, text),
        Selection::cursor(caret),
        ChangeOrigin::PageLink,
        "insert-text",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str, start: usize, end: usize) -> EditorSnapshot {
        let mut snapshot = EditorSnapshot::new(text.to_string());
        snapshot.set_selection(Selection::new(start, end));
        snapshot
    }

    #[test]
    fn applies_single_change_and_reports_outcome() {
        let mut snapshot = snapshot("hello world", 0, 0);
        let transaction = Transaction::new(
            TextChange::new(5, 11, ", blinko"),
            Selection::cursor(13),
            ChangeOrigin::PageLink,
            "insert-text",
        );

        let outcome = snapshot.apply_transaction(transaction).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome {
                text_changed: true,
                selection_changed: true,
            }
        );
        assert_eq!(snapshot.text, "hello, blinko");
        assert_eq!(snapshot.selection, Selection::cursor(13));
    }

    #[test]
    fn rejects_changes_past_the_end() {
        let mut snapshot = EditorSnapshot::new("abc".to_string());
        let transaction = Transaction::new(
            TextChange::new(2, 5, "x"),
            Selection::cursor(0),
            ChangeOrigin::Toolbar,
            "bold",
        );
        assert_eq!(
            snapshot.apply_transaction(transaction),
            Err(CoreError::InvalidRange {
                label: "bold",
                start: 2,
                end: 5,
                len: 3,
            })
        );
        assert_eq!(snapshot.text, "abc");
    }

    #[test]
    fn rejects_changes_inside_a_char() {
        let mut snapshot = EditorSnapshot::new("é".to_string());
        let transaction = Transaction::new(
            TextChange::new(1, 1, "x"),
            Selection::cursor(0),
            ChangeOrigin::TagPicker,
            "insert-tag",
        );
        assert!(matches!(
            snapshot.apply_transaction(transaction),
            Err(CoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn bold_wraps_selection_and_keeps_it_selected() {
        let mut snapshot = snapshot("say blinko now", 4, 10);
        let changed =
            apply_markdown_command(&mut snapshot, ToolbarAction::Bold.command()).unwrap();

        assert!(changed);
        assert_eq!(snapshot.text, "say **blinko** now");
        assert_eq!(snapshot.selection, Selection::new(6, 12));
    }

    #[test]
    fn italic_without_selection_places_caret_between_markers() {
        let mut snapshot = snapshot("ab", 1, 1);
        apply_markdown_command(&mut snapshot, ToolbarAction::Italic.command()).unwrap();
        assert_eq!(snapshot.text, "a**b");
        assert_eq!(snapshot.selection, Selection::cursor(2));
    }

    #[test]
    fn line_prefix_breaks_line_when_mid_line() {
        let mut snapshot = snapshot("first", 5, 5);
        apply_markdown_command(&mut snapshot, ToolbarAction::Todo.command()).unwrap();
        assert_eq!(snapshot.text, "first\n- [ ] ");
        assert_eq!(snapshot.selection, Selection::cursor(snapshot.text.len()));
    }

    #[test]
    fn line_prefix_at_line_start_does_not_break() {
        let mut snapshot = snapshot("first\n", 6, 6);
        apply_markdown_command(&mut snapshot, ToolbarAction::Quote.command()).unwrap();
        assert_eq!(snapshot.text, "first\n> ");

        let mut empty = snapshot_at_start();
        apply_markdown_command(&mut empty, ToolbarAction::NumberedList.command()).unwrap();
        assert_eq!(empty.text, "1. ");
    }

    fn snapshot_at_start() -> EditorSnapshot {
        snapshot("", 0, 0)
    }

    #[test]
    fn line_prefix_keeps_selected_text() {
        let mut snapshot = snapshot("ab cd", 3, 5);
        apply_markdown_command(&mut snapshot, ToolbarAction::BulletList.command()).unwrap();
        assert_eq!(snapshot.text, "ab \n- cd");
        assert_eq!(snapshot.selection, Selection::cursor(6));
    }

    #[test]
    fn code_block_wraps_selection_on_own_lines() {
        let mut snapshot = snapshot("run ls -la", 4, 10);
        apply_markdown_command(&mut snapshot, MarkdownCommand::CodeBlock).unwrap();
        assert_eq!(snapshot.text, "run \n```\nls -la\n```");
        assert_eq!(snapshot.selection, Selection::new(9, 15));
    }

    #[test]
    fn empty_code_block_puts_caret_inside() {
        let mut snapshot = snapshot_at_start();
        apply_markdown_command(&mut snapshot, MarkdownCommand::CodeBlock).unwrap();
        assert_eq!(snapshot.text, "```\n\n```");
        assert_eq!(snapshot.selection, Selection::cursor(4));
    }

    #[test]
    fn insert_text_replaces_selection() {
        let mut snapshot = snapshot("see HERE please", 4, 8);
        let link = "[Blinko](https://blinko.space)".to_string();
        let len = link.len();
        apply_markdown_command(&mut snapshot, MarkdownCommand::InsertText(link)).unwrap();
        assert_eq!(snapshot.text, "see [Blinko](https://blinko.space) please");
        assert_eq!(snapshot.selection, Selection::cursor(4 + len));
    }

    #[test]
    fn insert_tag_adds_hash_and_trailing_space() {
        let mut snapshot = snapshot("note", 4, 4);
        apply_markdown_command(
            &mut snapshot,
            MarkdownCommand::InsertTag("work/deadline".to_string()),
        )
        .unwrap();
        assert_eq!(snapshot.text, "note\n#work/deadline ");
        assert_eq!(snapshot.selection, Selection::cursor(snapshot.text.len()));

        let mut fresh = snapshot_at_start();
        apply_markdown_command(&mut fresh, MarkdownCommand::InsertTag("#done".to_string()))
            .unwrap();
        assert_eq!(fresh.text, "#done ");
    }

    #[test]
    fn empty_tag_is_ignored() {
        let mut snapshot = snapshot("x", 1, 1);
        let changed =
            apply_markdown_command(&mut snapshot, MarkdownCommand::InsertTag(String::new()))
                .unwrap();
        assert!(!changed);
        assert_eq!(snapshot.text, "x");
    }

    #[test]
    fn converts_utf16_offsets() {
        let text = "a😀é b";
        assert_eq!(utf16_to_byte(text, 0), 0);
        assert_eq!(utf16_to_byte(text, 1), 1);
        assert_eq!(utf16_to_byte(text, 3), 5);
        assert_eq!(utf16_to_byte(text, 4), 7);
        assert_eq!(utf16_to_byte(text, 99), text.len());
        assert_eq!(byte_to_utf16(text, 5), 3);
        assert_eq!(byte_to_utf16(text, 6), 3);
    }

    #[test]
    fn field_round_trip_after_edit() {
        let mut snapshot = EditorSnapshot::from_field("😀 hi".to_string(), 3, 5);
        assert_eq!(snapshot.selection, Selection::new(5, 7));
        apply_markdown_command(&mut snapshot, ToolbarAction::Bold.command()).unwrap();
        assert_eq!(snapshot.text, "😀 **hi**");
        assert_eq!(snapshot.field_selection(), (5, 7));
    }
}
